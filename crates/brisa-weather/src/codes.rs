//! WMO weather code table.
//!
//! The upstream service classifies conditions with WMO integer codes. This is
//! a total mapping: any code outside the known subset lands on `Unknown`
//! rather than failing a lookup.

use serde::{Deserialize, Serialize};

/// Known WMO codes plus an explicit `Unknown` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCode {
    ClearSky,
    MainlyClear,
    PartlyCloudy,
    Overcast,
    Fog,
    DepositingRimeFog,
    LightDrizzle,
    ModerateDrizzle,
    DenseDrizzle,
    LightFreezingDrizzle,
    DenseFreezingDrizzle,
    SlightRain,
    ModerateRain,
    HeavyRain,
    LightFreezingRain,
    HeavyFreezingRain,
    SlightSnow,
    ModerateSnow,
    HeavySnow,
    SnowGrains,
    SlightRainShowers,
    ModerateRainShowers,
    ViolentRainShowers,
    SlightSnowShowers,
    HeavySnowShowers,
    Thunderstorm,
    ThunderstormSlightHail,
    ThunderstormHeavyHail,
    #[default]
    Unknown,
}

/// Description, icon glyph and color hint for one code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodeInfo {
    pub description: &'static str,
    pub icon: &'static str,
    pub color_hint: &'static str,
}

/// Fallback for codes outside the table.
pub const UNKNOWN_INFO: CodeInfo = CodeInfo {
    description: "Unknown",
    icon: "❓",
    color_hint: "#888888",
};

impl WeatherCode {
    /// Convert a WMO weather code to its variant. Total: never fails.
    /// See: https://open-meteo.com/en/docs#weathervariables
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::ClearSky,
            1 => Self::MainlyClear,
            2 => Self::PartlyCloudy,
            3 => Self::Overcast,
            45 => Self::Fog,
            48 => Self::DepositingRimeFog,
            51 => Self::LightDrizzle,
            53 => Self::ModerateDrizzle,
            55 => Self::DenseDrizzle,
            56 => Self::LightFreezingDrizzle,
            57 => Self::DenseFreezingDrizzle,
            61 => Self::SlightRain,
            63 => Self::ModerateRain,
            65 => Self::HeavyRain,
            66 => Self::LightFreezingRain,
            67 => Self::HeavyFreezingRain,
            71 => Self::SlightSnow,
            73 => Self::ModerateSnow,
            75 => Self::HeavySnow,
            77 => Self::SnowGrains,
            80 => Self::SlightRainShowers,
            81 => Self::ModerateRainShowers,
            82 => Self::ViolentRainShowers,
            85 => Self::SlightSnowShowers,
            86 => Self::HeavySnowShowers,
            95 => Self::Thunderstorm,
            96 => Self::ThunderstormSlightHail,
            99 => Self::ThunderstormHeavyHail,
            _ => Self::Unknown,
        }
    }

    pub fn info(&self) -> CodeInfo {
        match self {
            Self::ClearSky => CodeInfo {
                description: "Clear sky",
                icon: "☀️",
                color_hint: "#FFD700",
            },
            Self::MainlyClear => CodeInfo {
                description: "Mainly clear",
                icon: "🌤️",
                color_hint: "#FDB813",
            },
            Self::PartlyCloudy => CodeInfo {
                description: "Partly cloudy",
                icon: "⛅",
                color_hint: "#9DB4C0",
            },
            Self::Overcast => CodeInfo {
                description: "Overcast",
                icon: "☁️",
                color_hint: "#8B8B8B",
            },
            Self::Fog => CodeInfo {
                description: "Fog",
                icon: "🌫️",
                color_hint: "#B0C4DE",
            },
            Self::DepositingRimeFog => CodeInfo {
                description: "Depositing rime fog",
                icon: "🌫️",
                color_hint: "#B0C4DE",
            },
            Self::LightDrizzle => CodeInfo {
                description: "Light drizzle",
                icon: "🌦️",
                color_hint: "#4682B4",
            },
            Self::ModerateDrizzle => CodeInfo {
                description: "Moderate drizzle",
                icon: "🌦️",
                color_hint: "#4682B4",
            },
            Self::DenseDrizzle => CodeInfo {
                description: "Dense drizzle",
                icon: "🌧️",
                color_hint: "#1E90FF",
            },
            Self::LightFreezingDrizzle => CodeInfo {
                description: "Light freezing drizzle",
                icon: "🌨️",
                color_hint: "#87CEEB",
            },
            Self::DenseFreezingDrizzle => CodeInfo {
                description: "Dense freezing drizzle",
                icon: "🌨️",
                color_hint: "#4682B4",
            },
            Self::SlightRain => CodeInfo {
                description: "Slight rain",
                icon: "🌧️",
                color_hint: "#4169E1",
            },
            Self::ModerateRain => CodeInfo {
                description: "Moderate rain",
                icon: "🌧️",
                color_hint: "#0000CD",
            },
            Self::HeavyRain => CodeInfo {
                description: "Heavy rain",
                icon: "🌧️",
                color_hint: "#00008B",
            },
            Self::LightFreezingRain => CodeInfo {
                description: "Light freezing rain",
                icon: "🌨️",
                color_hint: "#87CEEB",
            },
            Self::HeavyFreezingRain => CodeInfo {
                description: "Heavy freezing rain",
                icon: "🌨️",
                color_hint: "#4682B4",
            },
            Self::SlightSnow => CodeInfo {
                description: "Slight snow",
                icon: "🌨️",
                color_hint: "#F0F8FF",
            },
            Self::ModerateSnow => CodeInfo {
                description: "Moderate snow",
                icon: "❄️",
                color_hint: "#E0FFFF",
            },
            Self::HeavySnow => CodeInfo {
                description: "Heavy snow",
                icon: "❄️",
                color_hint: "#B0E0E6",
            },
            Self::SnowGrains => CodeInfo {
                description: "Snow grains",
                icon: "🌨️",
                color_hint: "#ADD8E6",
            },
            Self::SlightRainShowers => CodeInfo {
                description: "Slight rain showers",
                icon: "🌦️",
                color_hint: "#4682B4",
            },
            Self::ModerateRainShowers => CodeInfo {
                description: "Moderate rain showers",
                icon: "⛈️",
                color_hint: "#4169E1",
            },
            Self::ViolentRainShowers => CodeInfo {
                description: "Violent rain showers",
                icon: "⛈️",
                color_hint: "#0000CD",
            },
            Self::SlightSnowShowers => CodeInfo {
                description: "Slight snow showers",
                icon: "🌨️",
                color_hint: "#F0F8FF",
            },
            Self::HeavySnowShowers => CodeInfo {
                description: "Heavy snow showers",
                icon: "❄️",
                color_hint: "#E0FFFF",
            },
            Self::Thunderstorm => CodeInfo {
                description: "Thunderstorm",
                icon: "⛈️",
                color_hint: "#483D8B",
            },
            Self::ThunderstormSlightHail => CodeInfo {
                description: "Thunderstorm with slight hail",
                icon: "⛈️",
                color_hint: "#2F4F4F",
            },
            Self::ThunderstormHeavyHail => CodeInfo {
                description: "Thunderstorm with heavy hail",
                icon: "⛈️",
                color_hint: "#191970",
            },
            Self::Unknown => UNKNOWN_INFO,
        }
    }

    pub fn description(&self) -> &'static str {
        self.info().description
    }

    pub fn icon(&self) -> &'static str {
        self.info().icon
    }

    pub fn color_hint(&self) -> &'static str {
        self.info().color_hint
    }
}

/// Look up display metadata for a raw WMO code. Never fails.
pub fn lookup(code: i32) -> CodeInfo {
    WeatherCode::from_code(code).info()
}

/// The WMO subset this table covers.
pub const KNOWN_CODES: [i32; 28] = [
    0, 1, 2, 3, 45, 48, 51, 53, 55, 56, 57, 61, 63, 65, 66, 67, 71, 73, 75, 77, 80, 81, 82, 85,
    86, 95, 96, 99,
];
