//! light pattern sequencing and output line mapping

use crate::{LIGHT_TICKS_PER_UNIT, LINE_COUNT};
use embedded_hal::digital::{OutputPin, PinState};
use tinyrand::Rand;

const MASK_BITS: u16 = LINE_COUNT as u16;
const MASK: u16 = (1 << MASK_BITS) - 1;

/// one step word: bits 0..9 light mask, bits 9..16 duration multiplier
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Step(u16);

impl Step {
    pub const fn new(mask: u16, units: u16) -> Self {
        Self((mask & MASK) | (units << MASK_BITS))
    }

    pub const fn mask(self) -> u16 {
        self.0 & MASK
    }

    pub const fn units(self) -> u16 {
        self.0 >> MASK_BITS
    }

    /// ticks to stay lit; zero advances on the next poll
    pub const fn deadline(self) -> u32 {
        self.units() as u32 * LIGHT_TICKS_PER_UNIT
    }
}

pub struct Pattern {
    pub steps: &'static [Step],
    pub repeats: u8,
}

pub const PATTERNS: [Pattern; 3] = [
    Pattern {
        steps: &[
            Step::new(0b100000000, 3),
            Step::new(0b011100000, 3),
            Step::new(0b000011111, 3),
        ],
        repeats: 1,
    },
    Pattern {
        steps: &[
            Step::new(0b110010000, 5),
            Step::new(0b100100001, 5),
            Step::new(0b101000100, 5),
            Step::new(0b111111111, 10),
        ],
        repeats: 1,
    },
    Pattern {
        steps: &[
            Step::new(0b100000000, 3),
            Step::new(0b110100000, 3),
            Step::new(0b110110001, 3),
            Step::new(0b110111011, 3),
            Step::new(0b110111111, 3),
            Step::new(0b111111111, 10),
            Step::new(0b000000000, 8),
            Step::new(0b111111111, 8),
        ],
        repeats: 1,
    },
];

/// sink for a 9-bit light mask
pub trait Lights {
    type Error;

    /// drive line n from mask bit n
    fn show(&mut self, mask: u16) -> Result<(), Self::Error>;
}

/// nine gpio lines, A..I in mask bit order
pub struct LedBank<P> {
    lines: [P; LINE_COUNT],
}

impl<P: OutputPin> LedBank<P> {
    pub fn new(lines: [P; LINE_COUNT]) -> Self {
        Self { lines }
    }

    pub fn release(self) -> [P; LINE_COUNT] {
        self.lines
    }
}

impl<P: OutputPin> Lights for LedBank<P> {
    type Error = P::Error;

    fn show(&mut self, mask: u16) -> Result<(), Self::Error> {
        for (bit, line) in self.lines.iter_mut().enumerate() {
            line.set_state(PinState::from((mask >> bit) & 1 == 1))?;
        }
        Ok(())
    }
}

/// what one call to [`LightSequencer::advance`] emitted
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Advance {
    pub pattern: usize,
    pub step: usize,
    pub mask: u16,
    /// ticks until the next advance is due
    pub deadline: u32,
    /// pattern was freshly picked by this call
    pub picked: bool,
}

pub struct LightSequencer {
    patterns: &'static [Pattern],
    /// none until the next advance picks one
    pattern: Option<usize>,
    step: usize,
    repeat: u8,
}

impl Default for LightSequencer {
    fn default() -> Self {
        Self::new(&PATTERNS)
    }
}

impl LightSequencer {
    /// # Panics
    ///
    /// In debug builds, if `patterns` is empty or any pattern has no steps.
    pub fn new(patterns: &'static [Pattern]) -> Self {
        debug_assert!(!patterns.is_empty(), "no patterns");
        debug_assert!(
            patterns.iter().all(|p| !p.steps.is_empty()),
            "pattern without steps"
        );
        Self {
            patterns,
            pattern: None,
            step: 0,
            repeat: 0,
        }
    }

    /// selected pattern, if any
    pub fn selected(&self) -> Option<usize> {
        self.pattern
    }

    /// show the current step and move the cursor on; the caller resets its
    /// elapsed tick count and waits for the returned deadline
    pub fn advance<L: Lights>(
        &mut self,
        rand: &mut impl Rand,
        lights: &mut L,
    ) -> Result<Advance, L::Error> {
        let (index, picked) = match self.pattern {
            Some(index) => (index, false),
            None => {
                let index = (rand.next_u64() % self.patterns.len() as u64) as usize;
                self.pattern = Some(index);
                self.step = 0;
                self.repeat = 0;
                (index, true)
            }
        };
        let pattern = &self.patterns[index];
        let step = pattern.steps[self.step];
        lights.show(step.mask())?;

        let advance = Advance {
            pattern: index,
            step: self.step,
            mask: step.mask(),
            deadline: step.deadline(),
            picked,
        };

        self.step += 1;
        if self.step >= pattern.steps.len() {
            self.step = 0;
            self.repeat += 1;
            if self.repeat >= pattern.repeats {
                // re-pick on next advance
                self.repeat = 0;
                self.pattern = None;
            }
        }
        Ok(advance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use heapless::Vec;

    /// always returns the same word
    struct Fixed(u64);

    impl Rand for Fixed {
        fn next_u64(&mut self) -> u64 {
            self.0
        }
    }

    #[derive(Default)]
    struct Recorder {
        masks: Vec<u16, 32>,
    }

    impl Lights for Recorder {
        type Error = Infallible;

        fn show(&mut self, mask: u16) -> Result<(), Self::Error> {
            self.masks.push(mask).unwrap();
            Ok(())
        }
    }

    #[derive(Default)]
    struct Pin {
        high: bool,
    }

    impl embedded_hal::digital::ErrorType for Pin {
        type Error = Infallible;
    }

    impl OutputPin for Pin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            Ok(())
        }
    }

    #[test]
    fn step_packing() {
        let step = Step::new(0b111111111, 10);
        assert_eq!(step.0, 0b111111111 + (10 << 9));
        assert_eq!(step.mask(), 0x1ff);
        assert_eq!(step.units(), 10);
        assert_eq!(step.deadline(), 20_000);
        assert_eq!(Step::new(0, 0).deadline(), 0);
    }

    #[test]
    fn each_pattern_runs_once_in_order() {
        for (index, pattern) in PATTERNS.iter().enumerate() {
            let mut sequencer = LightSequencer::default();
            let mut rand = Fixed(index as u64);
            let mut lights = Recorder::default();
            for (i, step) in pattern.steps.iter().enumerate() {
                let advance = sequencer.advance(&mut rand, &mut lights).unwrap();
                assert_eq!(advance.pattern, index);
                assert_eq!(advance.step, i);
                assert_eq!(advance.picked, i == 0);
                assert_eq!(advance.deadline, step.deadline());
            }
            assert_eq!(sequencer.selected(), None);
            let expected: Vec<u16, 32> = pattern.steps.iter().map(|s| s.mask()).collect();
            assert_eq!(lights.masks, expected);
        }
    }

    #[test]
    fn ninth_advance_repicks() {
        let mut sequencer = LightSequencer::default();
        let mut rand = Fixed(2);
        let mut lights = Recorder::default();
        for i in 0..8 {
            let advance = sequencer.advance(&mut rand, &mut lights).unwrap();
            assert_eq!((advance.pattern, advance.step), (2, i));
        }
        rand.0 = 1;
        let advance = sequencer.advance(&mut rand, &mut lights).unwrap();
        assert!(advance.picked);
        assert_eq!((advance.pattern, advance.step), (1, 0));
        assert_eq!(sequencer.selected(), Some(1));
    }

    #[test]
    fn zero_units_chain_immediately() {
        static CHAIN: [Pattern; 1] = [Pattern {
            steps: &[Step::new(0b1, 0), Step::new(0b10, 2)],
            repeats: 2,
        }];
        let mut sequencer = LightSequencer::new(&CHAIN);
        let mut rand = Fixed(0);
        let mut lights = Recorder::default();
        let deadlines: [u32; 4] =
            core::array::from_fn(|_| sequencer.advance(&mut rand, &mut lights).unwrap().deadline);
        assert_eq!(deadlines, [0, 4000, 0, 4000]);
        assert_eq!(sequencer.selected(), None);
    }

    #[test]
    #[should_panic]
    fn rejects_pattern_without_steps() {
        static HOLLOW: [Pattern; 2] = [
            Pattern {
                steps: &[Step::new(0b1, 1)],
                repeats: 1,
            },
            Pattern {
                steps: &[],
                repeats: 1,
            },
        ];
        LightSequencer::new(&HOLLOW);
    }

    #[test]
    #[should_panic]
    fn rejects_empty_table() {
        LightSequencer::new(&[]);
    }

    #[test]
    fn led_bank_maps_bits_to_lines() {
        let mut bank = LedBank::new(core::array::from_fn(|_| Pin::default()));
        bank.show(0b100000101).unwrap();
        let lines = bank.release();
        let high: [bool; LINE_COUNT] = core::array::from_fn(|i| lines[i].high);
        assert_eq!(
            high,
            [true, false, true, false, false, false, false, false, true]
        );
    }
}
