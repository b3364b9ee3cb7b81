//! The Authority `Servers` handler
//!
//! `Authority` binds the filter, the dataset and the stream adapter into
//! one call: compile the request into a `Matcher`, open the configured
//! dataset on a producer thread and forward every match to the caller's
//! sink.

use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use authority_config::DatasetConfig;
use authority_protocol::ServersRequest;

use crate::error::Result;
use crate::filter::Matcher;
use crate::sink::ServerSink;
use crate::stream::{CallState, ServerStream};

/// Handler for `Servers` calls against one dataset
#[derive(Debug, Clone)]
pub struct Authority {
    dataset_path: PathBuf,
}

impl Authority {
    /// Serve the dataset at `dataset_path`
    ///
    /// The path is not checked here; the file is opened fresh on every
    /// call, so a missing dataset only fails the calls that need it.
    pub fn new<P: AsRef<Path>>(dataset_path: P) -> Self {
        Self {
            dataset_path: dataset_path.as_ref().to_path_buf(),
        }
    }

    /// Create from the `[dataset]` config section
    pub fn from_config(config: &DatasetConfig) -> Self {
        Self::new(&config.path)
    }

    /// Path of the served dataset
    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    /// Start a call and return its match stream
    ///
    /// The request is validated before anything else happens, so an invalid
    /// pattern fails without touching the dataset.
    pub fn stream(&self, request: &ServersRequest, cancel: &CancellationToken) -> Result<ServerStream> {
        let state = CallState::Init.transition(CallState::Compiling);

        let matcher = match Matcher::compile(request) {
            Ok(matcher) => matcher,
            Err(e) => {
                let state = state.transition(CallState::Failed);
                debug!(?state, error = %e, "stream finished");
                return Err(e);
            }
        };
        state.transition(CallState::Scanning);

        debug!(
            pattern = ?matcher.name_pattern(),
            datacenters = ?request.datacenter_filter,
            dataset = %self.dataset_path.display(),
            "starting scan"
        );

        Ok(ServerStream::spawn(
            self.dataset_path.clone(),
            matcher,
            cancel,
        ))
    }

    /// Run a whole `Servers` call, sending every match to `sink`
    ///
    /// Returns the number of items sent on success, otherwise the single
    /// error that ended the call.
    pub async fn servers<S>(
        &self,
        request: &ServersRequest,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<u64>
    where
        S: ServerSink + ?Sized,
    {
        let stream = self.stream(request, cancel)?;
        let sent = stream.forward(sink).await?;

        info!(sent, "servers call completed");
        Ok(sent)
    }
}
