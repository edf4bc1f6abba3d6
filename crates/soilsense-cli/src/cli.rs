//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use soilsense_core::{AreaUnit, RecommendationContext, SensorReading};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Land-area unit accepted on the command line
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum UnitArg {
    #[default]
    Acre,
    Hectare,
    M2,
}

impl From<UnitArg> for AreaUnit {
    fn from(unit: UnitArg) -> Self {
        match unit {
            UnitArg::Acre => AreaUnit::Acre,
            UnitArg::Hectare => AreaUnit::Hectare,
            UnitArg::M2 => AreaUnit::SquareMeter,
        }
    }
}

/// Options controlling a BLE acquisition
#[derive(Debug, Clone, Default, Args)]
pub struct AcquireArgs {
    /// Notification timeout in milliseconds (overrides config)
    #[arg(short = 'T', long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Fail instead of reading the characteristic when no notification arrives
    #[arg(long)]
    pub no_fallback: bool,

    /// Choose among matching sensors interactively
    #[arg(long)]
    pub pick: bool,

    /// Advertised sensor name (overrides config)
    #[arg(long, env = "SOILSENSE_DEVICE_NAME")]
    pub device_name: Option<String>,
}

/// Manually entered sensor values
#[derive(Debug, Clone, Default, Args)]
pub struct ReadingArgs {
    /// Soil moisture in percent
    #[arg(long, requires = "ec")]
    pub moisture: Option<f32>,

    /// EC channel value (used for TDS and N/P/K)
    #[arg(long, requires = "moisture")]
    pub ec: Option<f32>,

    /// Field-measured pH (the sensor has no pH channel)
    #[arg(long)]
    pub ph: Option<f32>,
}

impl ReadingArgs {
    /// The manual reading, if moisture and EC were given.
    pub fn reading(&self) -> Option<SensorReading> {
        let (moisture, ec) = (self.moisture?, self.ec?);
        Some(self.apply_ph(SensorReading::from_channels(moisture, ec)))
    }

    /// Attach `--ph` to a reading obtained some other way.
    pub fn apply_ph(&self, reading: SensorReading) -> SensorReading {
        match self.ph {
            Some(ph) => reading.with_ph(ph),
            None => reading,
        }
    }
}

/// Season and weather the recommendation is made for
#[derive(Debug, Clone, Args)]
pub struct ContextArgs {
    /// Growing season (e.g. kharif, rabi, zaid)
    #[arg(short, long)]
    pub season: String,

    /// Current weather (e.g. sunny, rainy, humid)
    #[arg(short, long)]
    pub weather: String,
}

impl ContextArgs {
    pub fn context(&self) -> RecommendationContext {
        RecommendationContext::new(
            self.weather.trim().to_lowercase(),
            self.season.trim().to_lowercase(),
        )
    }
}

#[derive(Parser)]
#[command(name = "soilsense")]
#[command(author, version, about = "CLI for SoilSense soil sensors", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "SOILSENSE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Write output to file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Acquire one snapshot from the sensor
    Read {
        #[command(flatten)]
        acquire: AcquireArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Recommend crops (and fertilizer) for a reading
    Recommend {
        #[command(flatten)]
        context: ContextArgs,

        #[command(flatten)]
        reading: ReadingArgs,

        #[command(flatten)]
        acquire: AcquireArgs,

        /// Plot size for a fertilizer plan
        #[arg(long)]
        area: Option<f64>,

        /// Unit of --area
        #[arg(long, value_enum, requires = "area")]
        unit: Option<UnitArg>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Classify manually entered values against the threshold table
    Classify {
        /// Soil moisture in percent
        #[arg(long)]
        moisture: f32,

        /// EC channel value
        #[arg(long)]
        ec: f32,

        /// Field-measured pH
        #[arg(long)]
        ph: Option<f32>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Decode a raw payload given as hex (e.g. 2a11)
    Decode {
        /// Payload bytes in hex
        hex: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List the crop rules, or explain which ones match a reading
    Rules {
        /// Rule table to load instead of the configured one
        #[arg(long)]
        file: Option<PathBuf>,

        /// Show every rule matching the given values
        #[arg(
            long,
            requires = "moisture",
            requires = "ec",
            requires = "season",
            requires = "weather"
        )]
        explain: bool,

        #[command(flatten)]
        reading: ReadingArgs,

        /// Growing season for --explain
        #[arg(short, long)]
        season: Option<String>,

        /// Current weather for --explain
        #[arg(short, long)]
        weather: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Manage CLI configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration subcommands
#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show configuration file path
    Path,

    /// Show the effective configuration
    Show,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
