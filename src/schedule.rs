//! Day grid for the back-office schedule page and the time arithmetic
//! behind booking end times.
//!
//! The grid is a brute-force scan: for every (slot, professional) cell we
//! look for the first non-canceled appointment of that professional whose
//! start hour equals the slot hour. Two appointments inside the same hour
//! collapse into one cell; nothing here prevents double-booking.

use crate::models::{occupies_slot, AppointmentRow, ProfessionalRow};

pub const OPENING_HOUR: u32 = 8;
pub const CLOSING_HOUR: u32 = 21;

/// Hourly slot labels covering the shop's operating window, "08:00"
/// through "21:00" inclusive.
pub fn hour_slots() -> Vec<String> {
    (OPENING_HOUR..=CLOSING_HOUR)
        .map(|hour| format!("{hour:02}:00"))
        .collect()
}

/// Parses "HH:MM" into hour and minute, rejecting anything out of range.
pub fn parse_time(value: &str) -> Option<(u32, u32)> {
    let (hour, minute) = value.trim().split_once(':')?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    if hour < 24 && minute < 60 {
        Some((hour, minute))
    } else {
        None
    }
}

pub fn start_hour(value: &str) -> Option<u32> {
    parse_time(value).map(|(hour, _)| hour)
}

/// End time of an appointment starting at `start` and lasting
/// `duration_min` minutes. Integer minute arithmetic with the hour wrapped
/// at the 24h boundary; the date of an appointment spilling past midnight
/// is left untouched.
pub fn end_time(start: &str, duration_min: i64) -> Option<String> {
    if duration_min < 0 {
        return None;
    }
    let (hour, minute) = parse_time(start)?;
    let total = i64::from(hour) * 60 + i64::from(minute) + duration_min;
    Some(format!("{:02}:{:02}", (total / 60) % 24, total % 60))
}

#[derive(Clone, Debug)]
pub struct SlotAppointment {
    pub id: String,
    pub client_name: String,
    pub service_name: String,
    pub status: String,
    pub start_time: String,
}

#[derive(Clone, Debug)]
pub struct GridCell {
    pub professional_id: String,
    pub hour: String,
    pub appointment: Option<SlotAppointment>,
}

#[derive(Clone, Debug)]
pub struct GridRow {
    pub hour: String,
    pub cells: Vec<GridCell>,
}

/// One row per slot, one cell per professional, in the given orders.
pub fn build_grid(
    professionals: &[ProfessionalRow],
    appointments: &[AppointmentRow],
    slots: &[String],
) -> Vec<GridRow> {
    slots
        .iter()
        .map(|slot| {
            let slot_hour = start_hour(slot);
            let cells = professionals
                .iter()
                .map(|professional| {
                    let appointment = appointments
                        .iter()
                        .find(|appt| {
                            appt.professional_id == professional.id
                                && occupies_slot(&appt.status)
                                && start_hour(&appt.start_time) == slot_hour
                        })
                        .map(|appt| SlotAppointment {
                            id: appt.id.clone(),
                            client_name: appt.client_name.clone(),
                            service_name: appt.service_name.clone(),
                            status: appt.status.clone(),
                            start_time: appt.start_time.clone(),
                        });
                    GridCell {
                        professional_id: professional.id.clone(),
                        hour: slot.clone(),
                        appointment,
                    }
                })
                .collect();
            GridRow {
                hour: slot.clone(),
                cells,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{STATUS_CANCELED, STATUS_RESCHEDULED, STATUS_SCHEDULED};

    fn professional(id: &str) -> ProfessionalRow {
        ProfessionalRow {
            id: id.to_string(),
            name: format!("Professional {id}"),
            work_start: "08:00".to_string(),
            work_end: "21:00".to_string(),
            commission_pct: 40.0,
            likes: 0,
            created_at: "2024-06-01T12:00:00Z".to_string(),
        }
    }

    fn appointment(id: &str, professional_id: &str, start: &str, status: &str) -> AppointmentRow {
        AppointmentRow {
            id: id.to_string(),
            client_id: None,
            client_name: format!("Client {id}"),
            client_phone: "11 99999-0000".to_string(),
            service_id: None,
            service_name: "Haircut".to_string(),
            price: 35.0,
            duration_min: 30,
            professional_id: professional_id.to_string(),
            professional_name: format!("Professional {professional_id}"),
            date: "2024-06-10".to_string(),
            start_time: start.to_string(),
            end_time: end_time(start, 30).unwrap(),
            status: status.to_string(),
            created_at: "2024-06-01T12:00:00Z".to_string(),
        }
    }

    #[test]
    fn slots_cover_the_operating_window() {
        let slots = hour_slots();
        assert_eq!(slots.len(), 14);
        assert_eq!(slots.first().map(String::as_str), Some("08:00"));
        assert_eq!(slots.last().map(String::as_str), Some("21:00"));
    }

    #[test]
    fn end_time_matches_the_minute_formula() {
        let cases = [(0u32, 0u32), (8, 30), (12, 5), (23, 59)];
        let durations = [0i64, 15, 30, 45, 60, 90, 570];
        for &(h, m) in &cases {
            for &d in &durations {
                let start = format!("{h:02}:{m:02}");
                let total = i64::from(h) * 60 + i64::from(m) + d;
                let expected = format!("{:02}:{:02}", (total / 60) % 24, total % 60);
                assert_eq!(end_time(&start, d), Some(expected), "start {start} + {d}");
            }
        }
    }

    #[test]
    fn end_time_wraps_past_midnight_without_rolling_the_date() {
        assert_eq!(end_time("23:30", 45).as_deref(), Some("00:15"));
        assert_eq!(end_time("23:00", 60).as_deref(), Some("00:00"));
    }

    #[test]
    fn end_time_zero_pads() {
        assert_eq!(end_time("08:00", 30).as_deref(), Some("08:30"));
        assert_eq!(end_time("09:15", 105).as_deref(), Some("11:00"));
    }

    #[test]
    fn end_time_rejects_malformed_starts() {
        assert_eq!(end_time("8", 30), None);
        assert_eq!(end_time("25:00", 30), None);
        assert_eq!(end_time("10:75", 30), None);
        assert_eq!(end_time("10:00", -5), None);
    }

    #[test]
    fn cell_is_busy_iff_a_non_canceled_appointment_starts_in_that_hour() {
        let professionals = [professional("p1"), professional("p2")];
        let appointments = [
            appointment("a1", "p1", "09:15", STATUS_SCHEDULED),
            appointment("a2", "p2", "10:00", STATUS_CANCELED),
            appointment("a3", "p1", "10:30", STATUS_RESCHEDULED),
        ];
        let grid = build_grid(&professionals, &appointments, &hour_slots());

        let row_09 = &grid[1];
        assert_eq!(row_09.hour, "09:00");
        assert_eq!(
            row_09.cells[0].appointment.as_ref().map(|a| a.id.as_str()),
            Some("a1")
        );
        assert!(row_09.cells[1].appointment.is_none());

        let row_10 = &grid[2];
        // Canceled appointments leave their slot free.
        assert!(row_10.cells[1].appointment.is_none());
        // Rescheduled ones still occupy it.
        assert_eq!(
            row_10.cells[0].appointment.as_ref().map(|a| a.id.as_str()),
            Some("a3")
        );
    }

    #[test]
    fn first_match_wins_when_two_appointments_share_the_hour() {
        let professionals = [professional("p1")];
        let appointments = [
            appointment("early", "p1", "14:10", STATUS_SCHEDULED),
            appointment("late", "p1", "14:40", STATUS_SCHEDULED),
        ];
        let grid = build_grid(&professionals, &appointments, &hour_slots());
        let row_14 = grid.iter().find(|row| row.hour == "14:00").unwrap();
        assert_eq!(
            row_14.cells[0].appointment.as_ref().map(|a| a.id.as_str()),
            Some("early")
        );
    }

    #[test]
    fn free_cells_carry_their_slot_coordinates() {
        let professionals = [professional("p9")];
        let grid = build_grid(&professionals, &[], &hour_slots());
        let cell = &grid[0].cells[0];
        assert_eq!(cell.professional_id, "p9");
        assert_eq!(cell.hour, "08:00");
        assert!(cell.appointment.is_none());
    }
}
