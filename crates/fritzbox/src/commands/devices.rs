//! Device command handlers.

use serde::Serialize;
use tabled::Tabled;

use fritzbox_api::{Client, Device};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Table rows ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "AIN")]
    ain: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Product")]
    product: String,
    #[tabled(rename = "Functions")]
    functions: String,
    #[tabled(rename = "Connected")]
    connected: String,
    #[tabled(rename = "Locked")]
    locked: String,
}

impl DeviceRow {
    fn new(d: &Device, color: bool) -> Self {
        Self {
            ain: d.identifier.clone(),
            name: d.name.clone().unwrap_or_default(),
            product: d.product_name.clone(),
            functions: functions(d),
            connected: output::flag(d.connected, color),
            locked: output::flag(d.locked, color),
        }
    }
}

fn functions(d: &Device) -> String {
    d.capabilities
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn detail(d: &Device, color: bool) -> String {
    output::detail_lines(&[
        ("AIN", d.identifier.clone()),
        ("ID", d.id.clone().unwrap_or_else(|| "-".into())),
        ("Name", d.name.clone().unwrap_or_else(|| "-".into())),
        ("Product", d.product_name.clone()),
        ("Manufacturer", d.manufacturer.clone()),
        ("Firmware", d.firmware.clone()),
        ("Functions", functions(d)),
        ("Connected", output::flag(d.connected, color)),
        ("Locked", output::flag(d.locked, color)),
    ])
}

// ── Single readings ──────────────────────────────────────────────────

/// One value read from or written to a device.
#[derive(Debug, Serialize)]
struct Reading<T> {
    ain: String,
    name: Option<String>,
    #[serde(rename = "measurement")]
    kind: &'static str,
    value: T,
    #[serde(skip_serializing_if = "str::is_empty")]
    unit: &'static str,
}

impl<T: Serialize + ToString> Reading<T> {
    fn new(device: &Device, kind: &'static str, value: T, unit: &'static str) -> Self {
        Self {
            ain: device.ain(),
            name: device.name.clone(),
            kind,
            value,
            unit,
        }
    }

    fn render(&self, global: &GlobalOpts, shown: &str) -> String {
        output::render_single(
            &global.output,
            self,
            |r| {
                let label = r.name.as_deref().unwrap_or(&r.ain);
                format!("{label}: {} {shown}", r.kind).trim_end().to_owned()
            },
            |r| r.value.to_string(),
        )
    }
}

fn with_unit(value: impl std::fmt::Display, unit: &str) -> String {
    if unit.is_empty() {
        value.to_string()
    } else {
        format!("{value} {unit}")
    }
}

// ── Handler ──────────────────────────────────────────────────────────

pub async fn handle(client: &Client, args: DevicesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);

    let out = match args.command {
        DevicesCommand::List => {
            let devices = client.list_devices().await?;
            output::render_list(
                &global.output,
                &devices,
                |d| DeviceRow::new(d, color),
                Device::ain,
            )
        }

        DevicesCommand::Get { ain } => {
            let device = client.get_device(&ain).await?;
            output::render_single(&global.output, &device, |d| detail(d, color), Device::ain)
        }

        DevicesCommand::On { ain } => {
            let device = client.get_device(&ain).await?;
            let on = client.turn_on(&device).await?;
            Reading::new(&device, "switch", on, "")
                .render(global, &output::switch_state(on, color))
        }

        DevicesCommand::Off { ain } => {
            let device = client.get_device(&ain).await?;
            let state = client.turn_off(&device).await?;
            // Thermostats answer whether the off setpoint took effect.
            let on = !device.is_thermostat() && state;
            Reading::new(&device, "switch", on, "")
                .render(global, &output::switch_state(on, color))
        }

        DevicesCommand::Toggle { ain } => {
            let device = client.get_device(&ain).await?;
            let on = client.toggle(&device).await?;
            Reading::new(&device, "switch", on, "")
                .render(global, &output::switch_state(on, color))
        }

        DevicesCommand::Power { ain } => {
            let device = client.get_device(&ain).await?;
            let mw = client.get_power(&device).await?;
            Reading::new(&device, "power", mw, "mW").render(global, &with_unit(mw, "mW"))
        }

        DevicesCommand::Energy { ain } => {
            let device = client.get_device(&ain).await?;
            let wh = client.get_energy(&device).await?;
            Reading::new(&device, "energy", wh, "Wh").render(global, &with_unit(wh, "Wh"))
        }

        DevicesCommand::Temperature { ain } => {
            let device = client.get_device(&ain).await?;
            let celsius = client.get_temperature(&device).await?;
            Reading::new(&device, "temperature", celsius, "°C")
                .render(global, &with_unit(celsius, "°C"))
        }

        DevicesCommand::Target { ain } => {
            let device = client.get_device(&ain).await?;
            let celsius = client.get_soll_temperature(&device).await?;
            Reading::new(&device, "target", celsius, "°C")
                .render(global, &with_unit(celsius, "°C"))
        }

        DevicesCommand::SetTarget { ain, degrees } => {
            let device = client.get_device(&ain).await?;
            client.set_soll_temperature(&device, degrees).await?;
            let celsius = (degrees * 2.0).round() / 2.0;
            Reading::new(&device, "target", celsius, "°C")
                .render(global, &with_unit(celsius, "°C"))
        }
    };

    output::print_output(&out, global.quiet);
    Ok(())
}
