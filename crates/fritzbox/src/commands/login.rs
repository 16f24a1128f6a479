//! `login`: authenticate and show the resulting session.

use std::collections::BTreeMap;

use chrono::DateTime;
use serde::Serialize;

use fritzbox_api::Client;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct SessionSummary {
    sid: String,
    expires: Option<String>,
    rights: BTreeMap<String, u8>,
}

/// Login already happened during client setup; this only reports it.
pub fn handle(client: &Client, global: &GlobalOpts) -> Result<(), CliError> {
    let session = client.session().ok_or(CliError::AuthFailed)?;
    let summary = SessionSummary {
        sid: session.sid().to_owned(),
        expires: session.expires().as_ref().map(DateTime::to_rfc3339),
        rights: session
            .rights()
            .iter()
            .map(|r| (r.name.clone(), r.access))
            .collect(),
    };

    let out = output::render_single(
        &global.output,
        &summary,
        |s| {
            let rights = s
                .rights
                .iter()
                .map(|(name, access)| format!("{name}={access}"))
                .collect::<Vec<_>>()
                .join(", ");
            output::detail_lines(&[
                ("Session", s.sid.clone()),
                ("Expires", s.expires.clone().unwrap_or_else(|| "-".into())),
                ("Rights", rights),
            ])
        },
        |s| s.sid.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
