use deluge::{Connectivity, Session, Transport, fetch_all};

use super::{CommandContext, close_with, prepare};
use crate::error::Result;
use crate::output::CheckReport;

pub async fn execute(ctx: &CommandContext) -> Result<CheckReport> {
	let mut session = ctx.open_session()?;
	let outcome = run(&mut session).await;
	close_with(session, outcome).await
}

pub async fn run<T: Transport>(session: &mut Session<T>) -> Result<CheckReport> {
	let connectivity = prepare(session).await?;
	let snapshot = fetch_all(session, &[deluge::protocol::TorrentField::Name]).await?;

	let (connectivity, host) = match connectivity {
		Connectivity::AlreadyConnected => ("already-connected", None),
		Connectivity::Connected { host } => ("connected", Some(host.to_string())),
	};
	Ok(CheckReport {
		endpoint: session.endpoint().to_string(),
		connectivity: connectivity.to_string(),
		host,
		torrents: snapshot.len(),
	})
}
