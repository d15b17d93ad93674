use serde::{Deserialize, Serialize};

/// Countdown notifications emitted while a timed quiz is ticked by its caller.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TimerEvent {
    TimerTick(TimerTick),
    TimeExpired(TimeExpired),
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimerTick {
    pub session_id: String,
    pub remaining_seconds: u32,
    pub elapsed_seconds: u32,
    pub total_seconds: u32,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TimeExpired {
    pub session_id: String,
    pub total_seconds: u32,
    pub message: String,
}

impl TimerEvent {
    pub fn event_name(&self) -> &'static str {
        match self {
            TimerEvent::TimerTick(_) => "timer-tick",
            TimerEvent::TimeExpired(_) => "time-expired",
        }
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, TimerEvent::TimeExpired(_))
    }
}

/// Quiz countdown; decremented only through [`QuizClock::tick`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuizClock {
    pub total_seconds: u32,
    pub remaining_seconds: u32,
}

impl QuizClock {
    pub fn new(total_seconds: u32) -> Self {
        Self {
            total_seconds,
            remaining_seconds: total_seconds,
        }
    }

    pub fn tick(&mut self, elapsed_seconds: u32) -> u32 {
        self.remaining_seconds = self.remaining_seconds.saturating_sub(elapsed_seconds);
        self.remaining_seconds
    }

    pub fn elapsed_seconds(&self) -> u32 {
        self.total_seconds.saturating_sub(self.remaining_seconds)
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_seconds == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_saturates_at_zero() {
        let mut clock = QuizClock::new(90);
        assert_eq!(clock.tick(60), 30);
        assert_eq!(clock.tick(45), 0);
        assert!(clock.is_expired());
        assert_eq!(clock.elapsed_seconds(), 90);
    }

    #[test]
    fn elapsed_is_zero_when_remaining_exceeds_total() {
        let clock = QuizClock {
            total_seconds: 30,
            remaining_seconds: 45,
        };
        assert_eq!(clock.elapsed_seconds(), 0);
    }

    #[test]
    fn events_serialize_with_kebab_tag() {
        let event = TimerEvent::TimeExpired(TimeExpired {
            session_id: "quiz-1".to_string(),
            total_seconds: 180,
            message: "Time is up".to_string(),
        });
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "time-expired");
        assert_eq!(event.event_name(), "time-expired");
    }
}
