use crate::tick::{self, SampleClock, Speaker};
use crate::tui;
use color_eyre::{eyre::eyre, Result};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    FromSample, SizedSample,
};
use std::sync::{mpsc::Sender, Arc};
use tinsel_core::{Interrupt, Shared};

/// Open the default output device and run the tick interrupt inside its
/// callback. The stream must be kept alive for as long as ticks are wanted.
pub fn start(shared: Arc<Shared>, tui_tx: Sender<tui::Cmd>) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| eyre!("no output device"))?;
    let config = device.default_output_config()?;
    match config.sample_format() {
        cpal::SampleFormat::F32 => run::<f32>(&device, &config.into(), shared, tui_tx),
        cpal::SampleFormat::I16 => run::<i16>(&device, &config.into(), shared, tui_tx),
        cpal::SampleFormat::U16 => run::<u16>(&device, &config.into(), shared, tui_tx),
        format => Err(eyre!("unsupported sample format {:?}", format)),
    }
}

fn run<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: Arc<Shared>,
    tui_tx: Sender<tui::Cmd>,
) -> Result<cpal::Stream>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels as usize;
    let mut tick = Interrupt::new(Speaker::default(), SampleClock::new(config.sample_rate.0));
    let stream = device.build_output_stream(
        config,
        move |buffer: &mut [T], _: &cpal::OutputCallbackInfo| {
            tick::render(&mut tick, &shared, buffer, channels)
        },
        move |err| {
            let _ = tui_tx.send(tui::Cmd::Log(format!("audio: {}", err)));
        },
        None,
    )?;
    stream.play()?;
    Ok(stream)
}
