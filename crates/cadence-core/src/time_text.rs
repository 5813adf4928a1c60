//! Cached, measured time text.
//!
//! A [`TimeText`] renders a formatted time string and keeps it, together
//! with its measured bounds, until the watched time field or the format
//! itself changes. Formatting and measuring are both supplied by the
//! caller; nothing here draws.

use std::rc::Rc;

/// The time component a [`TimeText`] watches for changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeField {
    /// Day of the year; changes once at midnight.
    Date,
    Hour,
    Minute,
    Second,
}

impl TimeField {
    fn value_of(self, time: &TimeSnapshot) -> u16 {
        match self {
            TimeField::Date => time.year_day,
            TimeField::Hour => u16::from(time.hour),
            TimeField::Minute => u16::from(time.minute),
            TimeField::Second => u16::from(time.second),
        }
    }
}

/// Broken-down time supplied by the host on each update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeSnapshot {
    pub year_day: u16,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Renders a [`TimeSnapshot`] to text. Replacing the closure (compared by
/// allocation identity) forces the next update to re-render.
pub type TimeFormat = Rc<dyn Fn(&TimeSnapshot) -> String>;

/// Measured text extents in host units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextBounds {
    pub width: u32,
    pub height: u32,
}

/// Measures rendered text; stands in for the host's paint object.
pub trait TextMeasurer {
    fn measure(&self, text: &str) -> TextBounds;
}

pub struct TimeText {
    field: TimeField,
    format: TimeFormat,
    format_changed: bool,
    value: Option<u16>,
    text: String,
    bounds: TextBounds,
}

impl TimeText {
    pub fn new(field: TimeField, format: TimeFormat) -> Self {
        Self {
            field,
            format,
            format_changed: false,
            value: None,
            text: String::new(),
            bounds: TextBounds::default(),
        }
    }

    /// The most recently rendered text; empty before the first update.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn width(&self) -> u32 {
        self.bounds.width
    }

    pub fn height(&self) -> u32 {
        self.bounds.height
    }

    /// Swaps the format closure. A different closure marks the cache stale;
    /// installing the same `Rc` again does not.
    pub fn set_format(&mut self, format: TimeFormat) {
        self.format_changed = !Rc::ptr_eq(&self.format, &format);
        self.format = format;
    }

    /// Re-renders and re-measures only when the watched field's value or
    /// the format changed since the last update.
    pub fn update(&mut self, time: &TimeSnapshot, measurer: &dyn TextMeasurer) {
        if self.has_changed(time) {
            self.value = Some(self.field.value_of(time));
            self.text = (self.format)(time);
            self.bounds = measurer.measure(&self.text);
        }
    }

    fn has_changed(&mut self, time: &TimeSnapshot) -> bool {
        if self.format_changed {
            self.format_changed = false;
            return true;
        }
        self.value != Some(self.field.value_of(time))
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::{TextBounds, TextMeasurer, TimeField, TimeFormat, TimeSnapshot, TimeText};

    struct CountingMeasurer {
        calls: Cell<u32>,
    }

    impl CountingMeasurer {
        fn new() -> Self {
            Self {
                calls: Cell::new(0),
            }
        }
    }

    impl TextMeasurer for CountingMeasurer {
        fn measure(&self, text: &str) -> TextBounds {
            self.calls.set(self.calls.get() + 1);
            TextBounds {
                width: text.len() as u32 * 8,
                height: 16,
            }
        }
    }

    fn minute_format() -> TimeFormat {
        Rc::new(|time: &TimeSnapshot| format!("{:02}:{:02}", time.hour, time.minute))
    }

    #[test]
    fn first_update_renders_and_measures() {
        let mut text = TimeText::new(TimeField::Minute, minute_format());
        let measurer = CountingMeasurer::new();
        let time = TimeSnapshot {
            hour: 9,
            minute: 41,
            ..Default::default()
        };
        text.update(&time, &measurer);
        assert_eq!(text.text(), "09:41");
        assert_eq!(text.width(), 40);
        assert_eq!(text.height(), 16);
        assert_eq!(measurer.calls.get(), 1);
    }

    #[test]
    fn unchanged_field_skips_rerender() {
        let mut text = TimeText::new(TimeField::Minute, minute_format());
        let measurer = CountingMeasurer::new();
        let time = TimeSnapshot {
            hour: 9,
            minute: 41,
            second: 3,
            ..Default::default()
        };
        text.update(&time, &measurer);
        // Seconds move, the watched minute does not.
        let later = TimeSnapshot {
            second: 42,
            ..time
        };
        text.update(&later, &measurer);
        assert_eq!(measurer.calls.get(), 1);
    }

    #[test]
    fn field_change_rerenders() {
        let mut text = TimeText::new(TimeField::Minute, minute_format());
        let measurer = CountingMeasurer::new();
        let time = TimeSnapshot {
            hour: 9,
            minute: 41,
            ..Default::default()
        };
        text.update(&time, &measurer);
        let later = TimeSnapshot {
            minute: 42,
            ..time
        };
        text.update(&later, &measurer);
        assert_eq!(text.text(), "09:42");
        assert_eq!(measurer.calls.get(), 2);
    }

    #[test]
    fn new_format_closure_forces_rerender() {
        let format = minute_format();
        let mut text = TimeText::new(TimeField::Minute, format.clone());
        let measurer = CountingMeasurer::new();
        let time = TimeSnapshot {
            hour: 9,
            minute: 41,
            ..Default::default()
        };
        text.update(&time, &measurer);

        // Reinstalling the same closure is not a change.
        text.set_format(format);
        text.update(&time, &measurer);
        assert_eq!(measurer.calls.get(), 1);

        text.set_format(Rc::new(|t: &TimeSnapshot| format!("{:02}h{:02}", t.hour, t.minute)));
        text.update(&time, &measurer);
        assert_eq!(text.text(), "09h41");
        assert_eq!(measurer.calls.get(), 2);
    }
}
