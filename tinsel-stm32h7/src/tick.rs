use core::cell::RefCell;

use cortex_m::peripheral::{syst::SystClkSource, SYST};
use embassy_stm32::gpio::Output;
use embassy_sync::blocking_mutex::{raw::CriticalSectionRawMutex, Mutex};
use tinsel_core::{Interrupt, Shared, TickTimer};

/// in hz; pll1_p as configured in main
pub const SYSCLK_HZ: u32 = 480_000_000;

pub static SHARED: Shared = Shared::new();

static TICK: Mutex<CriticalSectionRawMutex, RefCell<Option<Interrupt<Output<'static>, SysTickTimer>>>> =
    Mutex::new(RefCell::new(None));

/// SysTick reloads in hardware; re-arming acknowledges the wrap flag
pub struct SysTickTimer {
    syst: SYST,
}

impl TickTimer for SysTickTimer {
    fn rearm(&mut self) {
        // COUNTFLAG clears on read
        let _ = self.syst.has_wrapped();
    }
}

/// hand the buzzer and SysTick to the interrupt and start ticking
pub fn start(buzzer: Output<'static>, mut syst: SYST) {
    syst.disable_counter();
    syst.set_clock_source(SystClkSource::Core);
    syst.set_reload(tinsel_core::systick_reload(SYSCLK_HZ));
    syst.clear_current();
    syst.enable_interrupt();
    syst.enable_counter();

    // ticks before this lands find no state and are dropped
    TICK.lock(|tick| {
        tick.replace(Some(Interrupt::new(buzzer, SysTickTimer { syst })));
    });
}

#[cortex_m_rt::exception]
fn SysTick() {
    TICK.lock(|tick| {
        if let Some(tick) = tick.borrow_mut().as_mut() {
            // gpio writes are infallible
            let _ = tick.on_tick(&SHARED);
        }
    });
}
