//! Phase scheduler timer using ESP-IDF's esp_timer API.
//!
//! One periodic timer whose callback is [`PhaseState::tick`] on the block
//! handed in at start.  The block travels as the callback argument, so the
//! callback needs no global state of its own.
//!
//! The callback runs in the esp_timer task context and only touches
//! single-byte atomics, so it never blocks the foreground loop.

use crate::scheduler::PhaseState;

use super::hw_init::HwInitError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
static mut PHASE_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: PHASE_TIMER is only written by `start_phase_timer()` and
/// `stop_phase_timer()`, both called from the foreground task.
#[cfg(target_os = "espidf")]
unsafe fn phase_timer() -> esp_timer_handle_t {
    unsafe { PHASE_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn phase_tick_cb(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the `&'static PhaseState` registered in
    // start_phase_timer(); it outlives the timer.
    let shared = unsafe { &*arg.cast::<PhaseState>() };
    shared.tick();
}

/// (Re)start the phase timer with `shared.tick()` every `period_us`.
#[cfg(target_os = "espidf")]
pub fn start_phase_timer(shared: &'static PhaseState, period_us: u32) -> Result<(), HwInitError> {
    stop_phase_timer();
    // SAFETY: PHASE_TIMER is written from the single foreground task, and
    // the previous timer (if any) was stopped and deleted above.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(phase_tick_cb),
            arg: core::ptr::from_ref(shared).cast_mut().cast(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: c"phase".as_ptr(),
            skip_unhandled_events: true,
        };
        let ret = esp_timer_create(&args, &raw mut PHASE_TIMER);
        if ret != ESP_OK as i32 {
            return Err(HwInitError::TimerFailed(ret));
        }
        let ret = esp_timer_start_periodic(phase_timer(), u64::from(period_us));
        if ret != ESP_OK as i32 {
            return Err(HwInitError::TimerFailed(ret));
        }
    }
    info!("hw_timer: phase tick every {}us", period_us);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_phase_timer(_shared: &'static PhaseState, period_us: u32) -> Result<(), HwInitError> {
    log::debug!("hw_timer(sim): phase tick every {}us (driven by caller)", period_us);
    Ok(())
}

/// Stop and release the phase timer.  Safe to call when none is running.
#[cfg(target_os = "espidf")]
pub fn stop_phase_timer() {
    // SAFETY: phase_timer() contract; the null check prevents a double delete.
    unsafe {
        let t = phase_timer();
        if !t.is_null() {
            esp_timer_stop(t);
            esp_timer_delete(t);
            PHASE_TIMER = core::ptr::null_mut();
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_phase_timer() {}
