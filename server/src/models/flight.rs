use std::fmt;

use serde::{Deserialize, Serialize};

/// Flight status codes understood by the FlightSurety contracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlightStatus {
    #[default]
    Unknown,
    OnTime,
    LateAirline,
    LateWeather,
    LateTechnical,
    LateOther,
}

impl FlightStatus {
    pub const ALL: [FlightStatus; 6] = [
        FlightStatus::Unknown,
        FlightStatus::OnTime,
        FlightStatus::LateAirline,
        FlightStatus::LateWeather,
        FlightStatus::LateTechnical,
        FlightStatus::LateOther,
    ];

    /// On-chain status code
    pub fn code(self) -> u8 {
        match self {
            FlightStatus::Unknown => 0,
            FlightStatus::OnTime => 10,
            FlightStatus::LateAirline => 20,
            FlightStatus::LateWeather => 30,
            FlightStatus::LateTechnical => 40,
            FlightStatus::LateOther => 50,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            10 => FlightStatus::OnTime,
            20 => FlightStatus::LateAirline,
            30 => FlightStatus::LateWeather,
            40 => FlightStatus::LateTechnical,
            50 => FlightStatus::LateOther,
            _ => FlightStatus::Unknown,
        }
    }

    /// Maps the raw `:status` path segment. Only the exact literals
    /// `10`..`50` are recognised; anything else is `Unknown`.
    pub fn from_param(raw: &str) -> Self {
        match raw {
            "10" => FlightStatus::OnTime,
            "20" => FlightStatus::LateAirline,
            "30" => FlightStatus::LateWeather,
            "40" => FlightStatus::LateTechnical,
            "50" => FlightStatus::LateOther,
            _ => FlightStatus::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FlightStatus::Unknown => "UNKNOWN",
            FlightStatus::OnTime => "ON TIME",
            FlightStatus::LateAirline => "LATE AIRLINE",
            FlightStatus::LateWeather => "LATE WEATHER",
            FlightStatus::LateTechnical => "LATE TECHNICAL",
            FlightStatus::LateOther => "LATE OTHER",
        }
    }

    /// Delays caused by the airline trigger insuree credit.
    pub fn is_airline_fault(self) -> bool {
        self == FlightStatus::LateAirline
    }
}

impl fmt::Display for FlightStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
