use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use super::Msg;
use crate::{
    params::ParameterSet,
    participant::{LocalPlan, Participant, ParticipantErr, ParticipantId, Result, Update},
};

/// A serialized request together with the channel to answer it through.
struct Envelope {
    payload: String,
    reply: oneshot::Sender<String>,
}

/// Hosts a participant behind a channel, every request and response goes through its
/// serialized wire form but never leaves the process.
pub struct VirtualWorker {
    participant: Arc<dyn Participant>,
    rx: mpsc::Receiver<Envelope>,
}

impl VirtualWorker {
    /// Spawns a worker task hosting `participant`.
    ///
    /// # Arguments
    /// * `participant` - The participant that owns the data.
    ///
    /// # Returns
    /// The client half, which is itself a `Participant`, and the worker's task handle.
    pub fn spawn(participant: Arc<dyn Participant>) -> (RemoteParticipant, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(1);
        let remote = RemoteParticipant {
            id: participant.id(),
            name: participant.name().to_string(),
            tx,
        };

        let worker = Self { participant, rx };
        (remote, tokio::spawn(worker.run()))
    }

    /// Serves requests until a disconnect arrives or every client is dropped.
    async fn run(mut self) {
        let id = self.participant.id();
        info!(participant = id.0; "virtual worker started");

        while let Some(Envelope { payload, mut reply }) = self.rx.recv().await {
            let msg = match Msg::decode(&payload) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(participant = id.0; "dropping malformed request: {e}");
                    Self::respond(reply, &Msg::Err(e));
                    continue;
                }
            };

            let response = match msg {
                Msg::Train { params, plan } => {
                    debug!(participant = id.0, round = plan.round; "received parameters");
                    let cancel = CancellationToken::new();

                    let outcome = tokio::select! {
                        res = self.participant.train_local(Arc::new(params), plan, cancel.clone()) => Some(res),
                        _ = reply.closed() => None,
                    };

                    match outcome {
                        Some(Ok(update)) => Msg::Update(update),
                        Some(Err(e)) => Msg::Err(e),
                        None => {
                            cancel.cancel();
                            debug!(participant = id.0; "client went away, training abandoned");
                            continue;
                        }
                    }
                }
                Msg::Disconnect => {
                    Self::respond(reply, &Msg::Disconnect);
                    break;
                }
                other => {
                    warn!(participant = id.0; "unexpected message kind: {}", other.kind());
                    Msg::Err(ParticipantErr::Transport(format!(
                        "unexpected message kind {}",
                        other.kind()
                    )))
                }
            };

            Self::respond(reply, &response);
        }

        info!(participant = id.0; "virtual worker stopped");
    }

    fn respond(reply: oneshot::Sender<String>, msg: &Msg) {
        let payload = match msg.encode() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("failed to encode a {} response: {e}", msg.kind());
                return;
            }
        };

        // the client may have stopped waiting
        let _ = reply.send(payload);
    }
}

/// The client half of a `VirtualWorker`.
#[derive(Clone)]
pub struct RemoteParticipant {
    id: ParticipantId,
    name: String,
    tx: mpsc::Sender<Envelope>,
}

impl RemoteParticipant {
    /// Sends a message and waits for the worker's answer.
    async fn request(&self, msg: &Msg, cancel: &CancellationToken) -> Result<Msg> {
        let payload = msg.encode()?;
        let (reply, rx) = oneshot::channel();

        self.tx
            .send(Envelope { payload, reply })
            .await
            .map_err(|_| ParticipantErr::Transport("the worker hung up".into()))?;

        let response = tokio::select! {
            res = rx => res.map_err(|_| ParticipantErr::Transport("the worker dropped the request".into()))?,
            _ = cancel.cancelled() => return Err(ParticipantErr::Cancelled),
        };

        Msg::decode(&response)
    }

    /// Asks the worker to stop.
    pub async fn disconnect(&self) -> Result<()> {
        match self.request(&Msg::Disconnect, &CancellationToken::new()).await? {
            Msg::Disconnect => Ok(()),
            other => Err(ParticipantErr::Transport(format!(
                "expected a disconnect, got {}",
                other.kind()
            ))),
        }
    }
}

#[async_trait]
impl Participant for RemoteParticipant {
    fn id(&self) -> ParticipantId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn train_local(
        &self,
        params: Arc<ParameterSet>,
        plan: LocalPlan,
        cancel: CancellationToken,
    ) -> Result<Update> {
        let msg = Msg::Train {
            params: params.as_ref().clone(),
            plan,
        };

        match self.request(&msg, &cancel).await? {
            Msg::Update(update) => Ok(update),
            Msg::Err(e) => Err(e),
            other => Err(ParticipantErr::Transport(format!(
                "expected an update, got {}",
                other.kind()
            ))),
        }
    }
}
