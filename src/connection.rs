//! The connection façade (§3 `Connection`, §4.4-4.5): owns the transport's
//! write half, the receiver task, the two outbound queues, statement
//! storage, and the session parameters negotiated at startup.
use bytes::BytesMut;
use tokio::io::{AsyncWriteExt, WriteHalf, split};
use tokio::task::JoinHandle;

use crate::auth::{self, Startup};
use crate::common::trace;
use crate::decode::Decoder;
use crate::error::Error;
use crate::net::Transport;
use crate::options::{Config, TlsMode};
use crate::params::ConnectionParameters;
use crate::postgres::backend::BackendKeyData;
use crate::postgres::frontend::{self, FrontendMessage, Terminate};
use crate::receiver::{self, AllReceiver, DataReceiver};
use crate::statement::{NoStatementCache, StatementStorage};

use tokio::sync::mpsc;

/// An established session with a PostgreSQL server.
///
/// The receiver task owns [`Transport`]'s read half exclusively; `Connection`
/// owns the write half exclusively. No synchronization is needed between
/// the two beyond the `dataQ`/`allQ` channels, since the borrow checker
/// already forbids two callers from sending overlapping fragments through
/// one `&mut Connection`.
pub struct Connection {
    write_half: WriteHalf<Transport>,
    write_buf: BytesMut,
    receiver_task: JoinHandle<()>,
    data_rx: DataReceiver,
    all_rx: AllReceiver,
    pub params: ConnectionParameters,
    pub backend_key_data: BackendKeyData,
    pub stmts: Box<dyn StatementStorage>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("params", &self.params).finish_non_exhaustive()
    }
}

impl Connection {
    /// Connect using the standard `PG*` environment variables.
    pub async fn connect_env() -> Result<Self, Error> {
        let config = Config::from_env()?;
        Self::connect_with(config).await
    }

    /// Connect using a `postgres://` URL.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        let config = Config::parse(url)?;
        Self::connect_with(config).await
    }

    /// Connect with an already-parsed [`Config`], using [`NoStatementCache`]
    /// for statement storage.
    pub async fn connect_with(config: Config) -> Result<Self, Error> {
        Self::connect_with_storage(config, Box::new(NoStatementCache)).await
    }

    /// Connect with an already-parsed [`Config`] and a caller-supplied
    /// statement storage handle.
    pub async fn connect_with_storage(
        config: Config,
        stmts: Box<dyn StatementStorage>,
    ) -> Result<Self, Error> {
        if config.tls == TlsMode::Required {
            // TLS handshake is a stub hook in this driver; fail loudly
            // instead of silently downgrading to plaintext.
            return Err(Error::Configuration("TLS was requested but is not implemented"));
        }

        let mut transport = Transport::connect(config.host.as_str(), config.port).await?;
        let mut decoder = Decoder::new();

        let Startup { params, backend_key_data } = auth::perform(
            &mut transport,
            &mut decoder,
            config.user.as_str(),
            config.pass.as_str(),
            config.dbname.as_str(),
        )
        .await?;

        let (read_half, write_half) = split(transport);

        let (data_tx, data_rx) = mpsc::unbounded_channel();
        let (all_tx, all_rx) = mpsc::unbounded_channel();
        let receiver_task = tokio::task::spawn(receiver::run(read_half, decoder, data_tx, all_tx));

        Ok(Self {
            write_half,
            write_buf: BytesMut::new(),
            receiver_task,
            data_rx,
            all_rx,
            params,
            backend_key_data,
            stmts,
        })
    }

    /// Buffer a frontend message without flushing.
    pub(crate) fn send<F: FrontendMessage>(&mut self, msg: F) {
        trace!("(F) sending message tagged {:?}", F::MSGTYPE as char);
        frontend::write(msg, &mut self.write_buf);
    }

    /// Flush everything buffered by [`send`][Self::send] to the transport.
    pub(crate) async fn flush(&mut self) -> Result<(), Error> {
        if !self.write_buf.is_empty() {
            self.write_half.write_all(&self.write_buf).await?;
            self.write_buf.clear();
        }
        self.write_half.flush().await?;
        Ok(())
    }

    pub(crate) fn data_queue(&mut self) -> &mut DataReceiver {
        &mut self.data_rx
    }

    pub(crate) fn all_queue(&mut self) -> &mut AllReceiver {
        &mut self.all_rx
    }

    /// Terminate the session: send `Terminate`, abort the receiver task, and
    /// shut down the transport. Any reads still pending on a queue observe
    /// closure once both senders are dropped (see `receiver::run`'s doc
    /// comment for the matching half of this contract).
    pub async fn close(mut self) -> Result<(), Error> {
        self.send(Terminate);
        let _ = self.flush().await;
        self.receiver_task.abort();
        self.write_half.shutdown().await?;
        Ok(())
    }
}
