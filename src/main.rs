use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, LevelFilter};
use modbus_rs::{
    init_logger_with_level, ByteOrder, Instrument, InstrumentConfig, SerialPortTransport,
    TransmissionMode,
};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "modbus-cli")]
#[command(about = "CLI tool for Modbus RTU/ASCII instruments")]
struct Cli {
    /// Serial port, e.g. /dev/ttyUSB0
    #[arg(short, long)]
    port: Option<String>,

    #[arg(short, long)]
    baudrate: Option<u32>,

    /// Slave address (0 broadcasts writes)
    #[arg(short, long)]
    slave: Option<u8>,

    #[arg(short, long)]
    mode: Option<TransmissionMode>,

    #[arg(long)]
    timeout_ms: Option<u64>,

    /// JSON instrument configuration; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log every frame at info level
    #[arg(long)]
    debug: bool,

    #[arg(long)]
    close_after_call: bool,

    #[arg(long)]
    local_echo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    ReadRegister {
        address: u16,
        #[arg(short, long, default_value = "0")]
        decimals: u8,
        #[arg(short, long, default_value = "3")]
        function_code: u8,
        #[arg(long)]
        signed: bool,
    },
    WriteRegister {
        address: u16,
        #[arg(allow_hyphen_values = true)]
        value: f64,
        #[arg(short, long, default_value = "0")]
        decimals: u8,
        #[arg(short, long, default_value = "16")]
        function_code: u8,
        #[arg(long)]
        signed: bool,
    },
    ReadRegisters {
        address: u16,
        count: u16,
        #[arg(short, long, default_value = "3")]
        function_code: u8,
    },
    ReadBit {
        address: u16,
        #[arg(short, long, default_value = "2")]
        function_code: u8,
    },
    WriteBit {
        address: u16,
        value: u8,
        #[arg(short, long, default_value = "5")]
        function_code: u8,
    },
    ReadLong {
        address: u16,
        #[arg(short, long, default_value = "3")]
        function_code: u8,
        #[arg(long)]
        signed: bool,
        #[arg(long, default_value = "2")]
        registers: u16,
    },
    ReadFloat {
        address: u16,
        #[arg(short, long, default_value = "3")]
        function_code: u8,
        #[arg(long, default_value = "2")]
        registers: u16,
    },
    WriteFloat {
        address: u16,
        #[arg(allow_hyphen_values = true)]
        value: f64,
        #[arg(long, default_value = "2")]
        registers: u16,
    },
    ReadString {
        address: u16,
        registers: u16,
        #[arg(short, long, default_value = "3")]
        function_code: u8,
    },
    WriteString {
        address: u16,
        text: String,
        registers: u16,
    },
}

fn load_config(cli: &Cli) -> Result<InstrumentConfig> {
    let mut config = match &cli.config {
        Some(path) => InstrumentConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => {
            let port = cli
                .port
                .as_deref()
                .context("A serial port is required, pass --port or --config")?;
            InstrumentConfig::new(port)
        }
    };

    if let Some(port) = &cli.port {
        config.port = port.clone();
    }
    if let Some(baudrate) = cli.baudrate {
        config.serial.baudrate = baudrate;
    }
    if let Some(slave) = cli.slave {
        config.slave_address = slave;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.serial.timeout = Duration::from_millis(timeout_ms);
    }
    config.session.debug |= cli.debug;
    config.session.close_port_after_each_call |= cli.close_after_call;
    config.session.handle_local_echo |= cli.local_echo;
    Ok(config)
}

fn run(instrument: &mut Instrument<SerialPortTransport>, command: Commands) -> Result<()> {
    match command {
        Commands::ReadRegister {
            address,
            decimals,
            function_code,
            signed,
        } => {
            let value = instrument
                .read_register(address, decimals, function_code, signed)
                .with_context(|| format!("Failed to read register {address}"))?;
            info!("Register {address}: {value}");
        }
        Commands::WriteRegister {
            address,
            value,
            decimals,
            function_code,
            signed,
        } => {
            instrument
                .write_register(address, value, decimals, function_code, signed)
                .with_context(|| format!("Failed to write register {address}"))?;
            info!("Wrote {value} to register {address}");
        }
        Commands::ReadRegisters {
            address,
            count,
            function_code,
        } => {
            let values = instrument
                .read_registers(address, count, function_code)
                .with_context(|| format!("Failed to read {count} registers at {address}"))?;
            info!("Registers {address}..: {values:?}");
        }
        Commands::ReadBit {
            address,
            function_code,
        } => {
            let bit = instrument
                .read_bit(address, function_code)
                .with_context(|| format!("Failed to read bit {address}"))?;
            info!("Bit {address}: {bit}");
        }
        Commands::WriteBit {
            address,
            value,
            function_code,
        } => {
            instrument
                .write_bit(address, value, function_code)
                .with_context(|| format!("Failed to write bit {address}"))?;
            info!("Wrote {value} to bit {address}");
        }
        Commands::ReadLong {
            address,
            function_code,
            signed,
            registers,
        } => {
            let value = instrument
                .read_long(address, function_code, signed, ByteOrder::Big, registers)
                .with_context(|| format!("Failed to read long at {address}"))?;
            info!("Long {address}: {value}");
        }
        Commands::ReadFloat {
            address,
            function_code,
            registers,
        } => {
            let value = instrument
                .read_float(address, function_code, registers, ByteOrder::Big)
                .with_context(|| format!("Failed to read float at {address}"))?;
            info!("Float {address}: {value}");
        }
        Commands::WriteFloat {
            address,
            value,
            registers,
        } => {
            instrument
                .write_float(address, value, registers, ByteOrder::Big)
                .with_context(|| format!("Failed to write float at {address}"))?;
            info!("Wrote {value} to float at {address}");
        }
        Commands::ReadString {
            address,
            registers,
            function_code,
        } => {
            let text = instrument
                .read_string(address, registers, function_code)
                .with_context(|| format!("Failed to read string at {address}"))?;
            info!("String {address}: {text:?}");
        }
        Commands::WriteString {
            address,
            text,
            registers,
        } => {
            instrument
                .write_string(address, &text, registers)
                .with_context(|| format!("Failed to write string at {address}"))?;
            info!("Wrote {text:?} to {address}");
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    init_logger_with_level(level);

    let config = load_config(&cli)?;
    let mut instrument = config
        .connect()
        .with_context(|| format!("Failed to open serial port {}", config.port))?;
    info!("{instrument}");

    run(&mut instrument, cli.command)?;

    if let Some(roundtrip) = instrument.last_roundtrip_time() {
        info!("Round trip time: {roundtrip:?}");
    }
    Ok(())
}
