// Unit tests for the session time thresholds

use story_recorder::timebox::{
    display, message, must_stop, TimerDisplay, FINAL_WINDOW, LIMIT, ONE_MINUTE_WARNING, WARN_AT,
};

#[test]
fn test_thresholds() {
    assert_eq!(LIMIT, 360);
    assert_eq!(WARN_AT, 300);
    assert_eq!(FINAL_WINDOW, 15);
}

#[test]
fn test_message_only_at_warning_second() {
    assert_eq!(message(0), None);
    assert_eq!(message(299), None);
    assert_eq!(message(300).as_deref(), Some(ONE_MINUTE_WARNING));
    assert_eq!(message(301), None);
    assert_eq!(message(344), None);
}

#[test]
fn test_message_counts_down_in_final_window() {
    assert_eq!(message(345).as_deref(), Some("Only 15 seconds remaining!"));
    assert_eq!(message(350).as_deref(), Some("Only 10 seconds remaining!"));
    assert_eq!(message(359).as_deref(), Some("Only 1 seconds remaining!"));
    assert_eq!(message(360), None, "the cutoff message belongs to the controller");
}

#[test]
fn test_display_clock() {
    assert_eq!(display(0), TimerDisplay::Clock { minutes: 0, seconds: 0 });
    assert_eq!(display(0).to_string(), "0:00");
    assert_eq!(display(65).to_string(), "1:05");
    assert_eq!(display(300).to_string(), "5:00");
    assert_eq!(display(344).to_string(), "5:44");
    assert_eq!(display(360).to_string(), "6:00");
}

#[test]
fn test_display_countdown() {
    assert_eq!(display(345), TimerDisplay::Countdown(15));
    assert_eq!(display(345).to_string(), "15");
    assert_eq!(display(359).to_string(), "1");
}

#[test]
fn test_must_stop() {
    assert!(!must_stop(0));
    assert!(!must_stop(359));
    assert!(must_stop(360));
    assert!(must_stop(361));
}
