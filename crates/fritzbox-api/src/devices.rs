// Home automation device endpoints
//
// Every command is a GET on `/webservices/homeautoswitch.lua` with
// `switchcmd=<name>` plus `ain` and sometimes `param`. Apart from the
// device list, answers are a single plain-text token.

use reqwest::Method;
use tracing::debug;

use crate::client::Client;
use crate::error::Error;
use crate::models::{Device, DeviceList, clean_ain, parse_bool};

/// Command endpoint, resolved against the base URL.
pub const DEVICE_PATH: &str = "/webservices/homeautoswitch.lua";

/// `sethkrtsoll` values that switch a thermostat on/off instead of
/// setting a temperature.
const THERMOSTAT_ON: &str = "254";
const THERMOSTAT_OFF: &str = "253";

/// Setpoint range accepted by the thermostats, in degrees Celsius.
pub const SOLL_TEMPERATURE_RANGE: std::ops::RangeInclusive<f64> = 8.0..=28.0;

/// Build the relative command URL for `cmd` with extra query parameters.
fn command_url(cmd: &str, params: &[(&str, &str)]) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    query.append_pair("switchcmd", cmd);
    query.extend_pairs(params);
    format!("{DEVICE_PATH}?{}", query.finish())
}

/// Check that a device can take a command.
fn precheck(device: &Device, require_unlocked: bool) -> Result<(), Error> {
    if !device.is_connected() {
        return Err(Error::DeviceNotConnected {
            ain: device.identifier.clone(),
        });
    }
    if require_unlocked && device.is_locked() {
        return Err(Error::DeviceLocked {
            ain: device.identifier.clone(),
        });
    }
    Ok(())
}

fn unsupported(device: &Device, operation: &'static str) -> Error {
    Error::UnsupportedOperation {
        ain: device.identifier.clone(),
        operation,
    }
}

fn parse_number<T>(body: &str) -> Result<T, Error>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    body.parse().map_err(|e| Error::deserialization(e, body))
}

impl Client {
    /// Send a switch command for `device` and return the trimmed answer.
    async fn switch_command(
        &self,
        cmd: &str,
        device: &Device,
        param: Option<&str>,
    ) -> Result<String, Error> {
        let ain = device.ain();
        let mut params = vec![("ain", ain.as_str())];
        if let Some(param) = param {
            params.push(("param", param));
        }

        debug!(ain = %ain, cmd, ?param, "sending switch command");
        let request = self.build_request(Method::GET, &command_url(cmd, &params), None)?;
        let body = self.execute_text(request).await?;
        Ok(body.trim().to_owned())
    }

    /// List all devices known to the gateway.
    ///
    /// `GET /webservices/homeautoswitch.lua?switchcmd=getdevicelistinfos`
    pub async fn list_devices(&self) -> Result<Vec<Device>, Error> {
        debug!("listing devices");
        let request = self.build_request(
            Method::GET,
            &command_url("getdevicelistinfos", &[]),
            None,
        )?;
        let list: Option<DeviceList> = self.execute_decoded(request).await?;
        Ok(list
            .map(|l| l.devices.into_iter().map(Device::from).collect())
            .unwrap_or_default())
    }

    /// Fetch a single device by AIN. Whitespace in `ain` is ignored.
    pub async fn get_device(&self, ain: &str) -> Result<Device, Error> {
        let wanted = clean_ain(ain);
        self.list_devices()
            .await?
            .into_iter()
            .find(|d| d.ain() == wanted)
            .ok_or(Error::DeviceNotFound { ain: wanted })
    }

    /// Switch a socket or thermostat on.
    ///
    /// Devices that are neither get no command and still report success.
    pub async fn turn_on(&self, device: &Device) -> Result<bool, Error> {
        precheck(device, true)?;
        if device.is_socket() {
            self.switch_command("setswitchon", device, None).await?;
        } else if device.is_thermostat() {
            self.switch_command("sethkrtsoll", device, Some(THERMOSTAT_ON))
                .await?;
        } else {
            debug!(ain = %device.identifier, "device has no on/off function, nothing sent");
        }
        Ok(true)
    }

    /// Switch a socket or thermostat off.
    ///
    /// For thermostats the result tells whether the gateway confirmed the
    /// off setpoint; for sockets it is the switch state the gateway echoes
    /// (`false` once off). Devices that are neither get no command.
    pub async fn turn_off(&self, device: &Device) -> Result<bool, Error> {
        precheck(device, true)?;
        if device.is_thermostat() {
            let body = self
                .switch_command("sethkrtsoll", device, Some(THERMOSTAT_OFF))
                .await?;
            return Ok(body == THERMOSTAT_OFF);
        }
        if device.is_socket() {
            let body = self.switch_command("setswitchoff", device, None).await?;
            return parse_bool(&body).ok_or_else(|| Error::deserialization("not a boolean", &body));
        }
        debug!(ain = %device.identifier, "device has no on/off function, nothing sent");
        Ok(false)
    }

    /// Flip a socket's switch state and return the new state.
    pub async fn toggle(&self, device: &Device) -> Result<bool, Error> {
        precheck(device, true)?;
        if !device.is_socket() {
            return Err(unsupported(device, "toggling"));
        }
        let body = self.switch_command("setswitchtoggle", device, None).await?;
        parse_bool(&body).ok_or_else(|| Error::deserialization("not a boolean", &body))
    }

    /// Current power draw in milliwatts.
    pub async fn get_power(&self, device: &Device) -> Result<i64, Error> {
        precheck(device, false)?;
        if !device.has_energy_meter() {
            return Err(unsupported(device, "getting power"));
        }
        let body = self.switch_command("getswitchpower", device, None).await?;
        parse_number(&body)
    }

    /// Energy consumed since the last reset, in watt hours.
    pub async fn get_energy(&self, device: &Device) -> Result<i64, Error> {
        precheck(device, false)?;
        if !device.has_energy_meter() {
            return Err(unsupported(device, "getting energy"));
        }
        let body = self.switch_command("getswitchenergy", device, None).await?;
        parse_number(&body)
    }

    /// Measured temperature in degrees Celsius.
    ///
    /// The gateway reports tenths of a degree (`215` = 21.5°).
    pub async fn get_temperature(&self, device: &Device) -> Result<f64, Error> {
        precheck(device, false)?;
        if !device.has_temperature_sensor() {
            return Err(unsupported(device, "getting temperature"));
        }
        let body = self.switch_command("gettemperature", device, None).await?;
        Ok(f64::from(parse_number::<i32>(&body)?) / 10.0)
    }

    /// Thermostat setpoint ("soll" temperature) in degrees Celsius.
    ///
    /// The gateway reports half-degree steps (`16` = 8.0°). The off
    /// markers 253/254 are returned as [`Error::DeviceOff`].
    pub async fn get_soll_temperature(&self, device: &Device) -> Result<f64, Error> {
        precheck(device, false)?;
        if !device.is_thermostat() {
            return Err(unsupported(device, "getting soll temperature"));
        }
        let body = self.switch_command("gethkrtsoll", device, None).await?;
        let value = parse_number::<i32>(&body)?;
        if value == 253 || value == 254 {
            return Err(Error::DeviceOff {
                ain: device.identifier.clone(),
            });
        }
        Ok(f64::from(value) / 2.0)
    }

    /// Set the thermostat setpoint, in degrees Celsius within 8..=28.
    ///
    /// The value is rounded to half degrees. The gateway echoes the stored
    /// value; a mismatch is reported as [`Error::InconsistentResponse`].
    pub async fn set_soll_temperature(&self, device: &Device, degrees: f64) -> Result<(), Error> {
        precheck(device, true)?;
        if !device.is_thermostat() {
            return Err(unsupported(device, "setting soll temperature"));
        }
        if !SOLL_TEMPERATURE_RANGE.contains(&degrees) {
            return Err(Error::InvalidArgument(format!(
                "temperature must be between 8 and 28, got {degrees}"
            )));
        }

        // Range-checked above, so the cast cannot truncate.
        #[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
        let param = ((degrees * 2.0).round() as i64).to_string();

        let body = self
            .switch_command("sethkrtsoll", device, Some(&param))
            .await?;
        if body != param {
            return Err(Error::InconsistentResponse {
                expected: param,
                actual: body,
            });
        }
        Ok(())
    }
}
