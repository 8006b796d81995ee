mod audio;
mod board;
mod tick;
mod tui;

use color_eyre::Result;
use std::sync::{
    atomic::{AtomicBool, AtomicU16, Ordering},
    mpsc, Arc,
};
use tinsel_core::Shared;

fn main() -> Result<()> {
    color_eyre::install()?;

    let shared = Arc::new(Shared::new());
    let mask = Arc::new(AtomicU16::new(0));
    let stop = Arc::new(AtomicBool::new(false));
    let (tui_tx, tui_rx) = mpsc::channel();

    // audio callback is the tick interrupt; fall back to a silent ticker
    let (stream, ticker) = match audio::start(shared.clone(), tui_tx.clone()) {
        Ok(stream) => (Some(stream), None),
        Err(e) => {
            tui_tx.send(tui::Cmd::Log(format!("{}; ticking silently", e)))?;
            (None, Some(tick::spawn_ticker(shared.clone(), stop.clone())))
        }
    };
    let board = board::spawn(shared.clone(), mask.clone(), tui_tx, stop.clone());

    let mut terminal = ratatui::init();
    let result = tui::TuiHandler::new(mask, shared).run(&mut terminal, &tui_rx);
    ratatui::restore();

    stop.store(true, Ordering::Relaxed);
    drop(stream);
    if let Some(ticker) = ticker {
        ticker.join().map_err(|_| color_eyre::eyre::eyre!("ticker panicked"))??;
    }
    board
        .join()
        .map_err(|_| color_eyre::eyre::eyre!("board panicked"))??;
    result
}
