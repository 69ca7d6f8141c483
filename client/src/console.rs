//! Line-oriented console: command parsing and plain-text views.

use dispatch_core::{ConfigField, ConfigInput, MapLayout, Phase, StatusSummary};
use dispatch_env::{BackendSummary, StatusSnapshot};
use std::fmt::Write as _;

pub const HELP: &str = "\
Commands:
  points N | hospitals N | ambulances N   set a configuration field
  config                                  show the current configuration
  start | stop | restart                  control the simulation
  status                                  latest snapshot and status message
  map                                     ring map of the first locations
  summary                                 delivered patients and mean time (backend)
  help                                    this text
  quit                                    exit";

/// One console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Set(ConfigField, String),
    Config,
    Start,
    Stop,
    Restart,
    Status,
    Map,
    Summary,
    Help,
    Quit,
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<Command>, String> {
    let mut words = line.split_whitespace();
    let Some(word) = words.next() else {
        return Ok(None);
    };
    let rest: Vec<&str> = words.collect();

    let command = match word.to_lowercase().as_str() {
        "config" => Command::Config,
        "start" => Command::Start,
        "stop" => Command::Stop,
        "restart" => Command::Restart,
        "status" => Command::Status,
        "map" => Command::Map,
        "summary" => Command::Summary,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => match other.parse::<ConfigField>() {
            // Raw text; validation happens on start/restart
            Ok(field) => Command::Set(field, rest.join(" ")),
            Err(_) => return Err(format!("Unknown command: {word} (type 'help')")),
        },
    };
    Ok(Some(command))
}

pub fn render_config(input: &ConfigInput) -> String {
    ConfigField::ALL
        .iter()
        .map(|&field| {
            let value = input.get(field).filter(|v| !v.trim().is_empty());
            format!("{}={}", field, value.unwrap_or("<unset>"))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Phase, status message and the latest snapshot.
pub fn render_status(phase: Phase, log: Option<&str>, snapshot: Option<&StatusSnapshot>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Phase: {phase}");
    let _ = writeln!(out, "Log:   {}", log.unwrap_or("-"));

    let Some(snapshot) = snapshot else {
        out.push_str("No status yet");
        return out;
    };

    let summary = StatusSummary::from_snapshot(snapshot);
    let _ = writeln!(out, "Time: {}", summary.time);
    let _ = writeln!(out, "Delivered patients: {}", summary.delivered);
    for roster in &summary.standby {
        let _ = writeln!(
            out,
            "Hospital {} standby: {:?}",
            roster.hospital_id, roster.idle_ambulances
        );
    }

    let ambulance_counts: Vec<String> = summary
        .ambulances_by_state
        .iter()
        .map(|(state, n)| format!("{n} {state}"))
        .collect();
    let _ = writeln!(out, "Ambulances: {}", ambulance_counts.join(", "));
    for ambulance in &snapshot.ambulances {
        let _ = write!(
            out,
            "  ambulance {} @ {} - {} (hospital {})",
            ambulance.id, ambulance.location, ambulance.state, ambulance.hospital_id
        );
        if let Some(patient) = ambulance.patient_id {
            let _ = write!(out, " carrying patient {patient}");
        }
        out.push('\n');
    }

    let patient_counts: Vec<String> = summary
        .patients_by_state
        .iter()
        .map(|(state, n)| format!("{n} {state}"))
        .collect();
    let _ = write!(out, "Patients: {}", patient_counts.join(", "));
    for patient in &snapshot.patients {
        let _ = write!(out, "\n  patient {} @ {} - {}", patient.id, patient.location, patient.state);
    }
    out
}

/// One line per node, then the ring.
pub fn render_map(map: &MapLayout) -> String {
    if map.nodes.is_empty() {
        return "Map is empty".to_string();
    }

    let mut out = String::new();
    for node in &map.nodes {
        let hospitals: Vec<u32> = node.hospitals_here.iter().map(|h| h.id).collect();
        let ambulances: Vec<u32> = node.ambulances_here.iter().map(|a| a.id).collect();
        let patients: Vec<u32> = node.patients_here.iter().map(|p| p.id).collect();
        let _ = writeln!(
            out,
            "[{:>2}] ({:>6.1}, {:>6.1})  H{:?} A{:?} P{:?}",
            node.index, node.position.x, node.position.y, hospitals, ambulances, patients
        );
    }

    let ring: Vec<String> = map
        .edges
        .iter()
        .map(|edge| format!("{}-{}", edge.from, edge.to))
        .collect();
    let _ = write!(out, "Ring: {}", if ring.is_empty() { "-".to_string() } else { ring.join(" ") });
    out
}

pub fn render_summary(summary: &BackendSummary) -> String {
    format!(
        "Completed: {}, average time: {:.2}",
        summary.completed, summary.avg_time
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispatch_core::MapLayoutEngine;
    use dispatch_env::{Ambulance, AmbulanceState, Hospital};

    #[test]
    fn test_parse_lifecycle_commands() {
        assert_eq!(parse_command("start"), Ok(Some(Command::Start)));
        assert_eq!(parse_command("  STOP "), Ok(Some(Command::Stop)));
        assert_eq!(parse_command("exit"), Ok(Some(Command::Quit)));
        assert_eq!(parse_command(""), Ok(None));
    }

    #[test]
    fn test_parse_field_keeps_raw_text() {
        assert_eq!(
            parse_command("points 10"),
            Ok(Some(Command::Set(ConfigField::Points, "10".to_string())))
        );
        assert_eq!(
            parse_command("a -3"),
            Ok(Some(Command::Set(ConfigField::Ambulances, "-3".to_string())))
        );
        // Clearing a field
        assert_eq!(
            parse_command("hospitals"),
            Ok(Some(Command::Set(ConfigField::Hospitals, String::new())))
        );
    }

    #[test]
    fn test_parse_unknown() {
        let err = parse_command("launch").unwrap_err();
        assert!(err.contains("launch"));
    }

    #[test]
    fn test_render_config() {
        let input = ConfigInput::new().with(ConfigField::Points, "10");
        assert_eq!(
            render_config(&input),
            "points=10 hospitals=<unset> ambulances=<unset>"
        );
    }

    #[test]
    fn test_render_status_without_snapshot() {
        let text = render_status(Phase::Idle, None, None);
        assert!(text.contains("Phase: IDLE"));
        assert!(text.ends_with("No status yet"));
    }

    #[test]
    fn test_render_status_with_snapshot() {
        let snapshot = StatusSnapshot {
            time: 5.0,
            hospitals: vec![Hospital { id: 0, location: 0 }],
            ambulances: vec![Ambulance {
                id: 3,
                location: 2,
                state: AmbulanceState::Idle,
                hospital_id: 0,
                patient_id: None,
            }],
            patients: vec![],
        };
        let text = render_status(Phase::Running, Some("Simulation started"), Some(&snapshot));
        assert!(text.contains("Log:   Simulation started"));
        assert!(text.contains("Hospital 0 standby: [3]"));
        assert!(text.contains("ambulance 3 @ 2 - on standby"));
    }

    #[test]
    fn test_render_map_lists_every_node() {
        let map = MapLayoutEngine::default().map(&StatusSnapshot::default(), 4);
        let text = render_map(&map);
        assert_eq!(text.lines().count(), 5);
        assert!(text.ends_with("Ring: 0-1 1-2 2-3 3-0"));
    }

    #[test]
    fn test_render_summary() {
        let summary = BackendSummary {
            completed: 4,
            avg_time: 12.5,
        };
        assert_eq!(render_summary(&summary), "Completed: 4, average time: 12.50");
    }
}
