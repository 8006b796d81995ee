//! the polling main loop, on its own thread

use crate::tui;
use color_eyre::Result;
use embedded_hal::digital::{ErrorType, OutputPin};
use std::{
    convert::Infallible,
    sync::{
        atomic::{AtomicBool, AtomicU16, Ordering},
        mpsc::Sender,
        Arc,
    },
    thread::JoinHandle,
    time::Duration,
};
use tinsel_core::{Device, LedBank, Shared, Xorshift32, DEFAULT_SEED, STARTUP_DELAY_MS, TICK_US};
use tinyrand::Seeded;

const POLL_PERIOD: Duration = Duration::from_micros(TICK_US as u64);

/// one led line, mirrored into a bit of the mask the tui reads
pub struct Line {
    bit: u16,
    mask: Arc<AtomicU16>,
}

impl ErrorType for Line {
    type Error = Infallible;
}

impl OutputPin for Line {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.mask.fetch_and(!(1 << self.bit), Ordering::Relaxed);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.mask.fetch_or(1 << self.bit, Ordering::Relaxed);
        Ok(())
    }
}

pub fn lines(mask: &Arc<AtomicU16>) -> LedBank<Line> {
    LedBank::new(core::array::from_fn(|bit| Line {
        bit: bit as u16,
        mask: mask.clone(),
    }))
}

pub fn spawn(
    shared: Arc<Shared>,
    mask: Arc<AtomicU16>,
    tui_tx: Sender<tui::Cmd>,
    stop: Arc<AtomicBool>,
) -> JoinHandle<Result<()>> {
    std::thread::spawn(move || {
        let mut device = Device::new(lines(&mask), Xorshift32::seed(DEFAULT_SEED as u64));

        tui_tx.send(tui::Cmd::Log("settling...".to_string()))?;
        std::thread::sleep(Duration::from_millis(STARTUP_DELAY_MS));

        while !stop.load(Ordering::Relaxed) {
            let poll = device.poll(&shared)?;
            if poll.lights.is_some() || poll.note.is_some() {
                tui_tx.send(tui::Cmd::Poll(poll))?;
            }
            std::thread::sleep(POLL_PERIOD);
        }
        Ok(())
    })
}
