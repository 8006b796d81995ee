//! melody tables and note-to-task scheduling

use crate::{Shared, Task, DURATION_SCALE, HALF_PERIOD_DIVISOR, SILENCE_SCALE};
use tinyrand::Rand;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Note {
    C4,
    D4,
    E4,
    F4,
    G4,
    A4,
    B4,
    C5,
    D5,
    Rest,
}

impl Note {
    pub const ALL: [Note; 10] = [
        Note::C4,
        Note::D4,
        Note::E4,
        Note::F4,
        Note::G4,
        Note::A4,
        Note::B4,
        Note::C5,
        Note::D5,
        Note::Rest,
    ];

    /// melody table symbol
    pub const fn symbol(self) -> u8 {
        match self {
            Note::C4 => b'c',
            Note::D4 => b'd',
            Note::E4 => b'e',
            Note::F4 => b'f',
            Note::G4 => b'g',
            Note::A4 => b'a',
            Note::B4 => b'b',
            Note::C5 => b'C',
            Note::D5 => b'D',
            Note::Rest => b',',
        }
    }

    pub fn from_symbol(symbol: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|note| note.symbol() == symbol)
    }

    /// half of the tone period in microseconds; 0 for a rest
    pub const fn half_period_us(self) -> u16 {
        match self {
            Note::C4 => 1915,
            Note::D4 => 1700,
            Note::E4 => 1519,
            Note::F4 => 1432,
            Note::G4 => 1275,
            Note::A4 => 1136,
            Note::B4 => 1014,
            Note::C5 => 956,
            Note::D5 => 851,
            Note::Rest => 0,
        }
    }

    /// truncated to whole ticks
    pub const fn half_period(self) -> u16 {
        self.half_period_us() / HALF_PERIOD_DIVISOR
    }

    /// nominal pitch, before tick quantization
    pub const fn hz(self) -> Option<u32> {
        match self.half_period_us() {
            0 => None,
            us => Some(1_000_000 / (2 * us as u32)),
        }
    }
}

pub struct Melody {
    pub title: &'static str,
    /// one [`Note::symbol`] per note
    pub notes: &'static [u8],
    /// in beats, one per note
    pub durations: &'static [u8],
    /// tempo scalar shared by every note
    pub beat: u16,
}

impl Melody {
    pub const fn len(&self) -> usize {
        self.notes.len()
    }

    pub const fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}

const WE_WISH: Melody = Melody {
    title: "We Wish You a Merry Christmas",
    notes: b"dggagfeceaabagfdfbbCbageddeafg,,",
    durations: &[
        4, 4, 2, 2, 2, 2, 4, 4, 4, 4, 2, 2, 2, 2, 4, 4, 4, 4, 2, 2, 2, 2, 4, 4, 2, 2, 4, 4, 4, 8,
        8, 20,
    ],
    beat: 75,
};

const JINGLE: Melody = Melody {
    title: "Jingle Bells",
    notes: b"bbbbbbbDgab,CCCCCbbbbbaabaDbbbbbbbDgab,,CCCCCbbbbDDCag,,",
    durations: &[
        4, 4, 8, 4, 4, 8, 4, 4, 6, 2, 12, 4, 4, 4, 6, 2, 4, 4, 4, 2, 2, 4, 4, 4, 4, 8, 8, 4, 4, 8,
        4, 4, 8, 4, 4, 6, 2, 12, 4, 4, 4, 6, 2, 4, 4, 4, 2, 2, 4, 4, 4, 4, 12, 8, 20, 20,
    ],
    beat: 50,
};

const _: () = {
    assert!(WE_WISH.notes.len() == WE_WISH.durations.len());
    assert!(JINGLE.notes.len() == JINGLE.durations.len());
};

pub const MELODIES: [Melody; 2] = [WE_WISH, JINGLE];

impl Task {
    pub const fn for_note(note: Note, units: u8, beat: u16) -> Self {
        Self {
            half_period: note.half_period(),
            active: (units as u16)
                .saturating_mul(beat)
                .saturating_mul(DURATION_SCALE),
            silence: beat.saturating_mul(SILENCE_SCALE),
        }
    }
}

/// what one call to [`ToneScheduler::dispatch_next_note`] consumed
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Dispatch {
    pub melody: usize,
    pub index: usize,
    pub symbol: u8,
    /// none when the symbol is not in the note table; the slot is skipped
    pub note: Option<Note>,
    pub task: Option<Task>,
    /// melody was freshly picked by this call
    pub picked: bool,
}

pub struct ToneScheduler {
    melodies: &'static [Melody],
    /// none until the next dispatch picks one
    melody: Option<usize>,
    index: usize,
    beat: u16,
}

impl Default for ToneScheduler {
    fn default() -> Self {
        Self::new(&MELODIES)
    }
}

impl ToneScheduler {
    /// # Panics
    ///
    /// In debug builds, if `melodies` is empty or any melody is empty or has
    /// a duration count that differs from its note count.
    pub fn new(melodies: &'static [Melody]) -> Self {
        debug_assert!(!melodies.is_empty(), "no melodies");
        debug_assert!(
            melodies
                .iter()
                .all(|m| !m.is_empty() && m.notes.len() == m.durations.len()),
            "melody notes and durations must be non-empty and the same length"
        );
        Self {
            melodies,
            melody: None,
            index: 0,
            beat: 0,
        }
    }

    /// selected melody, if any
    pub fn selected(&self) -> Option<usize> {
        self.melody
    }

    /// Hand the next note of the current melody to the interrupt.
    ///
    /// Returns `None` without touching the cursor while a task is still live.
    pub fn dispatch_next_note(
        &mut self,
        rand: &mut impl Rand,
        shared: &Shared,
    ) -> Option<Dispatch> {
        if shared.is_playing() {
            return None;
        }
        let (melody_index, picked) = match self.melody {
            Some(index) => (index, false),
            None => {
                let index = (rand.next_u64() % self.melodies.len() as u64) as usize;
                self.melody = Some(index);
                self.index = 0;
                self.beat = self.melodies[index].beat;
                (index, true)
            }
        };
        let melody = &self.melodies[melody_index];
        let symbol = melody.notes[self.index];
        let note = Note::from_symbol(symbol);
        let task = note.map(|note| Task::for_note(note, melody.durations[self.index], self.beat));
        if let Some(task) = task {
            // idle was checked above and only this scheduler publishes
            let published = shared.publish(task);
            debug_assert!(published);
        }

        let dispatch = Dispatch {
            melody: melody_index,
            index: self.index,
            symbol,
            note,
            task,
            picked,
        };

        self.index += 1;
        if self.index >= melody.len() {
            // re-pick on next dispatch
            self.index = 0;
            self.melody = None;
        }
        Some(dispatch)
    }
}
