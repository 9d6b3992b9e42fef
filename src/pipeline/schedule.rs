//! Reminder synthesis: pure function from an extraction to notification
//! events. The notification collaborator consumes these as-is; regeneration
//! replaces the whole set.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::debug;

use super::lexicon;
use super::types::{
    AppointmentKind, AppointmentRecord, ExtractionResult, MedicationRecord, ReminderEvent,
    ReminderKind, TimingTag,
};

const DEFAULT_DURATION_DAYS: u32 = 7;
/// An appointment with a date but no clock time is assumed to be a
/// morning slot.
const DEFAULT_APPOINTMENT_TIME: (u32, u32) = (8, 0);
const EVE_REMINDER_TIME: (u32, u32) = (20, 0);

/// Expand every medication and appointment into concrete reminder events,
/// anchored at `start_date` (normally the day the document is processed).
pub fn schedule_reminders(result: &ExtractionResult, start_date: NaiveDate) -> Vec<ReminderEvent> {
    let mut events = Vec::new();
    for med in &result.medications {
        events.extend(medication_reminders(med, start_date));
    }
    for appt in &result.appointments {
        events.extend(appointment_reminders(appt));
    }
    debug!(events = events.len(), "reminder schedule generated");
    events
}

fn medication_reminders(med: &MedicationRecord, start_date: NaiveDate) -> Vec<ReminderEvent> {
    let (times, is_default) = dose_times(med);
    if times.is_empty() {
        // Neither timing words nor a recognizable frequency: inventing a
        // schedule would be worse than staying silent.
        debug!(name = %med.name, "no timing signal, skipping reminders");
        return Vec::new();
    }

    let days = duration_days(med.duration_text.as_deref());
    let body = medication_body(med);

    // The grid is fully expanded per day, so the events carry no repeat
    // rule; a consumer honoring one would fire every slot twice.
    let mut events = Vec::with_capacity(times.len() * days as usize);
    for day in 0..days {
        let date = start_date + Duration::days(day as i64);
        for &time in &times {
            events.push(ReminderEvent {
                kind: ReminderKind::Medication,
                scheduled_at: NaiveDateTime::new(date, time),
                repeat: None,
                title: format!("Uống thuốc: {}", med.name),
                body: body.clone(),
                is_default_schedule: is_default,
            });
        }
    }
    events
}

/// Clock times for one medication, and whether they came from the
/// frequency-pattern fallback rather than explicit timing words.
fn dose_times(med: &MedicationRecord) -> (Vec<NaiveTime>, bool) {
    if !med.timing.is_empty() {
        return (med.timing.iter().map(|t| t.clock_time()).collect(), false);
    }

    let Some(per_day) = frequency_per_day(med.frequency.as_deref()) else {
        return (Vec::new(), false);
    };
    let tags: &[TimingTag] = match per_day {
        1 => &[TimingTag::Morning],
        2 => &[TimingTag::Morning, TimingTag::Evening],
        3 => &[TimingTag::Morning, TimingTag::Noon, TimingTag::Evening],
        4 => &[
            TimingTag::Morning,
            TimingTag::Noon,
            TimingTag::Afternoon,
            TimingTag::Night,
        ],
        _ => return (Vec::new(), false),
    };
    (tags.iter().map(|t| t.clock_time()).collect(), true)
}

fn frequency_per_day(frequency: Option<&str>) -> Option<u32> {
    let caps = lexicon::FREQUENCY.captures(frequency?)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
}

/// Days covered by "trong 7 ngày" style duration text, defaulting when the
/// prescription named none.
fn duration_days(duration_text: Option<&str>) -> u32 {
    let Some(text) = duration_text else {
        return DEFAULT_DURATION_DAYS;
    };
    let Some(caps) = lexicon::DURATION.captures(text) else {
        return DEFAULT_DURATION_DAYS;
    };
    caps.get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|&d| d > 0)
        .unwrap_or(DEFAULT_DURATION_DAYS)
}

fn medication_body(med: &MedicationRecord) -> String {
    let mut parts = Vec::new();
    if !med.dosage_terms.is_empty() {
        parts.push(med.dosage_terms.join(", "));
    }
    if let Some(freq) = &med.frequency {
        parts.push(freq.clone());
    }
    if !med.timing.is_empty() {
        let labels: Vec<&str> = med.timing.iter().map(|t| t.label_vi()).collect();
        parts.push(labels.join(", "));
    }
    if parts.is_empty() {
        "theo chỉ định của bác sĩ".to_string()
    } else {
        parts.join(" · ")
    }
}

/// Three lead-up reminders per appointment; appointments with no resolvable
/// date produce none.
fn appointment_reminders(appt: &AppointmentRecord) -> Vec<ReminderEvent> {
    let Some(date) = appt.date else {
        debug!("appointment has no resolvable date, skipping reminders");
        return Vec::new();
    };
    let time = appt.time.unwrap_or_else(|| {
        NaiveTime::from_hms_opt(DEFAULT_APPOINTMENT_TIME.0, DEFAULT_APPOINTMENT_TIME.1, 0)
            .expect("static time")
    });
    let at = NaiveDateTime::new(date, time);
    let evening =
        NaiveTime::from_hms_opt(EVE_REMINDER_TIME.0, EVE_REMINDER_TIME.1, 0).expect("static time");

    let title = match appt.kind {
        AppointmentKind::General => "Tái khám".to_string(),
        AppointmentKind::Specialist => "Tái khám chuyên khoa".to_string(),
    };
    let body = |lead: &str| match &appt.notes {
        Some(notes) => format!("{lead} · {notes}"),
        None => lead.to_string(),
    };
    let event = |scheduled_at: NaiveDateTime, lead: &str| ReminderEvent {
        kind: ReminderKind::Appointment,
        scheduled_at,
        repeat: None,
        title: title.clone(),
        body: body(lead),
        is_default_schedule: false,
    };

    vec![
        event(
            NaiveDateTime::new(date - Duration::days(3), evening),
            "còn 3 ngày nữa đến lịch hẹn",
        ),
        event(
            NaiveDateTime::new(date - Duration::days(1), evening),
            "ngày mai có lịch hẹn",
        ),
        event(at - Duration::hours(1), "lịch hẹn sau 1 giờ nữa"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::types::ExtractionMethod;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 10).unwrap()
    }

    fn result_with(med: MedicationRecord) -> ExtractionResult {
        ExtractionResult {
            medications: vec![med],
            ..ExtractionResult::empty(ExtractionMethod::Local)
        }
    }

    #[test]
    fn explicit_timing_times_duration_gives_the_full_grid() {
        let mut med = MedicationRecord::new("Paracetamol");
        med.timing.insert(TimingTag::Morning);
        med.timing.insert(TimingTag::Evening);
        med.duration_text = Some("5 ngày".into());

        let events = schedule_reminders(&result_with(med), start());
        assert_eq!(events.len(), 10);
        assert!(events.iter().all(|e| !e.is_default_schedule));
        // One concrete event per slot per day, no repeat rule on top.
        assert!(events.iter().all(|e| e.repeat.is_none()));
        assert_eq!(
            events[0].scheduled_at,
            NaiveDateTime::new(start(), NaiveTime::from_hms_opt(7, 0, 0).unwrap())
        );
        assert_eq!(
            events[9].scheduled_at,
            NaiveDateTime::new(
                NaiveDate::from_ymd_opt(2025, 1, 14).unwrap(),
                NaiveTime::from_hms_opt(20, 0, 0).unwrap()
            )
        );
    }

    #[test]
    fn frequency_fallback_is_flagged_default() {
        let mut med = MedicationRecord::new("Amoxicillin");
        med.frequency = Some("3 lần/ngày".into());
        med.duration_text = Some("trong 2 ngày".into());

        let events = schedule_reminders(&result_with(med), start());
        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|e| e.is_default_schedule));
        let first_day_times: Vec<NaiveTime> =
            events.iter().take(3).map(|e| e.scheduled_at.time()).collect();
        assert_eq!(
            first_day_times,
            vec![
                NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
            ]
        );
    }

    #[test]
    fn four_times_daily_includes_the_night_slot() {
        let mut med = MedicationRecord::new("Oresol");
        med.frequency = Some("4 lần/ngày".into());
        med.duration_text = Some("1 ngày".into());

        let events = schedule_reminders(&result_with(med), start());
        assert_eq!(events.len(), 4);
        assert_eq!(
            events[3].scheduled_at.time(),
            NaiveTime::from_hms_opt(22, 0, 0).unwrap()
        );
    }

    #[test]
    fn no_timing_signal_means_no_invented_reminders() {
        let mut med = MedicationRecord::new("Berberin");
        med.push_dosage_term("100mg");

        let events = schedule_reminders(&result_with(med), start());
        assert!(events.is_empty());
    }

    #[test]
    fn missing_duration_defaults_to_a_week() {
        let mut med = MedicationRecord::new("Paracetamol");
        med.timing.insert(TimingTag::Morning);

        let events = schedule_reminders(&result_with(med), start());
        assert_eq!(events.len(), 7);
    }

    #[test]
    fn appointment_gets_three_lead_up_reminders() {
        let mut result = ExtractionResult::empty(ExtractionMethod::Local);
        result.appointments = vec![AppointmentRecord {
            kind: AppointmentKind::General,
            date: NaiveDate::from_ymd_opt(2025, 1, 20),
            time: NaiveTime::from_hms_opt(8, 0, 0),
            notes: None,
        }];

        let events = schedule_reminders(&result, start());
        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.kind == ReminderKind::Appointment));
        assert_eq!(
            events[0].scheduled_at,
            NaiveDateTime::new(
                NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
                NaiveTime::from_hms_opt(20, 0, 0).unwrap()
            )
        );
        assert_eq!(
            events[2].scheduled_at,
            NaiveDateTime::new(
                NaiveDate::from_ymd_opt(2025, 1, 20).unwrap(),
                NaiveTime::from_hms_opt(7, 0, 0).unwrap()
            )
        );
    }

    #[test]
    fn timeless_appointment_anchors_on_the_default_slot() {
        let mut result = ExtractionResult::empty(ExtractionMethod::Local);
        result.appointments = vec![AppointmentRecord {
            kind: AppointmentKind::Specialist,
            date: NaiveDate::from_ymd_opt(2025, 3, 5),
            time: None,
            notes: Some("mang kết quả xét nghiệm".into()),
        }];

        let events = schedule_reminders(&result, start());
        // 1 hour before the assumed 08:00 slot
        assert_eq!(
            events[2].scheduled_at.time(),
            NaiveTime::from_hms_opt(7, 0, 0).unwrap()
        );
        assert!(events[2].body.contains("xét nghiệm"));
        assert_eq!(events[2].title, "Tái khám chuyên khoa");
    }

    #[test]
    fn dateless_appointment_produces_no_reminders() {
        let mut result = ExtractionResult::empty(ExtractionMethod::Local);
        result.appointments = vec![AppointmentRecord {
            kind: AppointmentKind::General,
            date: None,
            time: NaiveTime::from_hms_opt(9, 0, 0),
            notes: None,
        }];

        assert!(schedule_reminders(&result, start()).is_empty());
    }
}
