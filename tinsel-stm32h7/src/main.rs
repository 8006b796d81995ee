#![no_std]
#![no_main]

mod tick;

use defmt::{debug, info, warn};
use embassy_executor::Spawner;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::time::Hertz;
use embassy_time::Timer;
use tinsel_core::{Device, LedBank, Poll, Xorshift32, MELODIES, STARTUP_DELAY_MS};
use {defmt_rtt as _, panic_probe as _};

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    let config = {
        use embassy_stm32::rcc::*;

        let mut config = embassy_stm32::Config::default();
        config.rcc.hse = Some(Hse {
            freq: Hertz::mhz(16),
            mode: HseMode::Oscillator,
        });
        config.rcc.pll1 = Some(Pll {
            source: PllSource::HSE,
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL240,
            divp: Some(PllDiv::DIV2),
            divq: None,
            divr: None,
        });
        config.rcc.sys = Sysclk::PLL1_P; // 480 MHz, see tick::SYSCLK_HZ

        config.rcc.ahb_pre = AHBPrescaler::DIV2; // 240 MHz
        config.rcc.apb1_pre = APBPrescaler::DIV2; // 120 MHz
        config.rcc.apb2_pre = APBPrescaler::DIV2; // 120 MHz
        config.rcc.apb3_pre = APBPrescaler::DIV2; // 120 MHz
        config.rcc.apb4_pre = APBPrescaler::DIV2; // 120 MHz
        config.rcc.voltage_scale = VoltageScale::Scale0;
        config
    };
    let p = embassy_stm32::init(config);

    // lines A..I on seed pins D0..D8
    let leds = LedBank::new([
        Output::new(p.PB12, Level::Low, Speed::Low),
        Output::new(p.PC11, Level::Low, Speed::Low),
        Output::new(p.PC10, Level::Low, Speed::Low),
        Output::new(p.PC9, Level::Low, Speed::Low),
        Output::new(p.PC8, Level::Low, Speed::Low),
        Output::new(p.PD2, Level::Low, Speed::Low),
        Output::new(p.PC12, Level::Low, Speed::Low),
        Output::new(p.PG10, Level::Low, Speed::Low),
        Output::new(p.PG11, Level::Low, Speed::Low),
    ]);
    // piezo on D9
    let buzzer = Output::new(p.PB4, Level::Low, Speed::Low);

    let core = cortex_m::Peripherals::take().unwrap();
    tick::start(buzzer, core.SYST);
    info!("ticking every {} us", tinsel_core::TICK_US);

    // let the hardware settle
    Timer::after_millis(STARTUP_DELAY_MS).await;
    info!("running");

    let mut device = Device::new(leds, Xorshift32::default());
    loop {
        match device.poll(&tick::SHARED) {
            Ok(poll) => log(&poll),
            Err(e) => match e {},
        }
        embassy_futures::yield_now().await;
    }
}

fn log(poll: &Poll) {
    if let Some(advance) = poll.lights.as_ref() {
        if advance.picked {
            info!("pattern {}", advance.pattern);
        }
        debug!("step {} -> {=u16:b}", advance.step, advance.mask);
    }
    if let Some(dispatch) = poll.note.as_ref() {
        if dispatch.picked {
            info!("melody {}", MELODIES[dispatch.melody].title);
        }
        match dispatch.task {
            Some(task) => debug!("note {} {}", dispatch.note, task),
            None => warn!(
                "symbol {=u8:x} at {} not in note table, skipped",
                dispatch.symbol, dispatch.index
            ),
        }
    }
}
