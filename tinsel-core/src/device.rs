//! main loop side of the device

use crate::{Advance, Dispatch, LightSequencer, Lights, Shared, ToneScheduler};
use tinyrand::Rand;

/// work handed off by one [`Device::poll`]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Poll {
    pub lights: Option<Advance>,
    pub note: Option<Dispatch>,
}

/// Both sequencers, the generator they share, and the led outputs.
pub struct Device<L, R> {
    lights: L,
    rand: R,
    sequencer: LightSequencer,
    tone: ToneScheduler,
    /// lights ticks until the next advance
    deadline: u32,
}

impl<L: Lights, R: Rand> Device<L, R> {
    pub fn new(lights: L, rand: R) -> Self {
        Self::with_sequencers(lights, rand, LightSequencer::default(), ToneScheduler::default())
    }

    pub fn with_sequencers(
        lights: L,
        rand: R,
        sequencer: LightSequencer,
        tone: ToneScheduler,
    ) -> Self {
        Self {
            lights,
            rand,
            sequencer,
            tone,
            deadline: 0,
        }
    }

    pub fn lights(&self) -> &L {
        &self.lights
    }

    pub fn deadline(&self) -> u32 {
        self.deadline
    }

    /// one pass of the main loop; never blocks
    pub fn poll(&mut self, shared: &Shared) -> Result<Poll, L::Error> {
        let mut poll = Poll::default();
        if shared.lights_elapsed() >= self.deadline {
            let advance = self.sequencer.advance(&mut self.rand, &mut self.lights)?;
            self.deadline = advance.deadline;
            shared.reset_lights();
            poll.lights = Some(advance);
        }
        if !shared.is_playing() {
            poll.note = self.tone.dispatch_next_note(&mut self.rand, shared);
        }
        Ok(poll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Interrupt, Pattern, Step, TickTimer, Xorshift32, PATTERNS};
    use core::convert::Infallible;
    use embedded_hal::digital::{ErrorType, OutputPin};

    #[derive(Default)]
    struct Mask(u16);

    impl Lights for Mask {
        type Error = Infallible;

        fn show(&mut self, mask: u16) -> Result<(), Self::Error> {
            self.0 = mask;
            Ok(())
        }
    }

    struct Free;

    impl TickTimer for Free {
        fn rearm(&mut self) {}
    }

    #[derive(Default)]
    struct Buzzer {
        edges: u32,
        high: bool,
    }

    impl ErrorType for Buzzer {
        type Error = Infallible;
    }

    impl OutputPin for Buzzer {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            if self.high {
                self.edges += 1;
            }
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            if !self.high {
                self.edges += 1;
            }
            self.high = true;
            Ok(())
        }
    }

    #[test]
    fn first_poll_starts_both() {
        let shared = Shared::new();
        let mut device = Device::new(Mask::default(), Xorshift32::default());
        let poll = device.poll(&shared).unwrap();

        // default seed: first word picks pattern 0, second picks melody 1
        let advance = poll.lights.unwrap();
        assert_eq!((advance.pattern, advance.step), (0, 0));
        assert_eq!(device.lights().0, PATTERNS[0].steps[0].mask());
        assert_eq!(device.deadline(), 6000);

        let note = poll.note.unwrap();
        assert_eq!((note.melody, note.index), (1, 0));
        assert!(shared.is_playing());

        // nothing due yet
        assert_eq!(device.poll(&shared).unwrap(), Poll::default());
    }

    #[test]
    fn lights_wait_for_deadline() {
        let shared = Shared::new();
        let mut device = Device::new(Mask::default(), Xorshift32::default());
        device.poll(&shared).unwrap();
        let mut isr = Interrupt::new(Buzzer::default(), Free);
        for _ in 0..5999 {
            isr.on_tick(&shared).unwrap();
        }
        assert!(device.poll(&shared).unwrap().lights.is_none());
        isr.on_tick(&shared).unwrap();
        let advance = device.poll(&shared).unwrap().lights.unwrap();
        assert_eq!((advance.pattern, advance.step), (0, 1));
        assert_eq!(shared.lights_elapsed(), 0);
    }

    #[test]
    fn zero_unit_steps_advance_every_poll() {
        static INSTANT: [Pattern; 1] = [Pattern {
            steps: &[
                Step::new(0b000000001, 0),
                Step::new(0b000000010, 0),
                Step::new(0b000000100, 1),
            ],
            repeats: 1,
        }];
        let shared = Shared::new();
        let mut device = Device::with_sequencers(
            Mask::default(),
            Xorshift32::default(),
            LightSequencer::new(&INSTANT),
            ToneScheduler::default(),
        );

        // no ticks in between
        let first = device.poll(&shared).unwrap().lights.unwrap();
        let second = device.poll(&shared).unwrap().lights.unwrap();
        let third = device.poll(&shared).unwrap().lights.unwrap();
        assert_eq!((first.step, first.deadline), (0, 0));
        assert_eq!((second.step, second.deadline), (1, 0));
        assert_eq!(third.step, 2);
        assert_eq!(device.lights().0, 0b000000100);
        assert_eq!(device.deadline(), 2000);
        assert!(device.poll(&shared).unwrap().lights.is_none());
    }

    #[test]
    fn runs_melody_against_ticks() {
        let shared = Shared::new();
        let mut device = Device::new(Mask::default(), Xorshift32::default());
        let mut isr = Interrupt::new(Buzzer::default(), Free);
        let mut notes = 0;
        let mut steps = 0;
        let mut masks = 0u16;
        // ten seconds of ticks
        for _ in 0..200_000 {
            let poll = device.poll(&shared).unwrap();
            notes += poll.note.is_some() as u32;
            steps += poll.lights.is_some() as u32;
            masks |= device.lights().0;
            isr.on_tick(&shared).unwrap();
        }
        assert!(notes > 10);
        assert!(steps > 10);
        assert_eq!(masks, Step::new(0x1ff, 0).mask());
        assert!(isr.buzzer().edges > 1000);
    }
}
