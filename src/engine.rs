use crate::model::{InferenceModel, RequestMetadata};
use std::{
    cell::Cell,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
        mpsc,
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

type Metadata<M> = <<M as InferenceModel>::Request as RequestMetadata>::Metadata;

/// What the worker sends back for a single request.
pub type EngineReply<M> = Result<
    EngineResponse<Metadata<M>, <M as InferenceModel>::Response>,
    EngineError<<M as InferenceModel>::Error>,
>;

/// Represents the current state of the inference engine.
#[derive(Clone, Debug, PartialEq)]
pub enum EngineState {
    /// The engine is idle and ready to accept new inference requests.
    Idle,
    /// The engine is currently processing an inference request.
    Processing,
}

impl EngineState {
    /// Returns the state as a string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineState::Idle => "idle",
            EngineState::Processing => "processing",
        }
    }
}

/// Errors surfaced to the submitter of a request.
#[derive(Debug, thiserror::Error)]
pub enum EngineError<E> {
    #[error("inference engine is stopped")]
    Stopped,
    #[error("inference worker disconnected")]
    Disconnected,
    #[error("inference worker panicked")]
    WorkerPanicked,
    #[error(transparent)]
    Model(E),
}

/// Response returned by the engine containing both the model's response and telemetry data.
pub struct EngineResponse<Metadata, Res> {
    /// Identifier matching the original request.
    pub id: u64,
    /// Timestamp when the inference started.
    pub start_time: Instant,
    /// Total time taken for the inference.
    pub duration: Duration,
    /// Lightweight metadata extracted from the original request.
    pub request_metadata: Metadata,
    /// The actual response from the model.
    pub response: Res,
}

/// Result of polling a pending inference without blocking.
pub enum EngineResult<M: InferenceModel>
where
    M::Request: RequestMetadata,
{
    /// Successful inference with the response data.
    Success(EngineResponse<Metadata<M>, M::Response>),
    /// No result available yet, with current engine state.
    Empty(EngineState),
    /// The result was already handed out by an earlier poll.
    Delivered,
    /// The model failed or the worker went away.
    Error(EngineError<M::Error>),
}

struct EngineRequest<M: InferenceModel>
where
    M::Request: RequestMetadata,
{
    id: u64,
    request: M::Request,
    reply: mpsc::Sender<EngineReply<M>>,
}

/// Handle to a request that has been queued on the engine.
pub struct PendingInference<M: InferenceModel>
where
    M::Request: RequestMetadata,
{
    id: u64,
    state: Arc<Mutex<EngineState>>,
    rx: mpsc::Receiver<EngineReply<M>>,
    delivered: Cell<bool>,
}

impl<M: InferenceModel> PendingInference<M>
where
    M::Request: RequestMetadata,
{
    /// Identifier assigned to the request at submission.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Blocks until the worker has answered this request.
    pub fn wait(self) -> EngineReply<M> {
        match self.rx.recv() {
            Ok(reply) => reply,
            Err(_) => Err(EngineError::Disconnected),
        }
    }

    /// Attempts to retrieve the result without blocking.
    ///
    /// A request yields its reply at most once; polling again afterwards
    /// reports `Delivered`.
    pub fn try_poll(&self) -> EngineResult<M> {
        match self.rx.try_recv() {
            Ok(reply) => {
                self.delivered.set(true);
                match reply {
                    Ok(response) => EngineResult::Success(response),
                    Err(e) => EngineResult::Error(e),
                }
            }
            Err(mpsc::TryRecvError::Empty) => EngineResult::Empty(read_state(&self.state)),
            Err(mpsc::TryRecvError::Disconnected) if self.delivered.get() => {
                log::debug!("Inference #{} already delivered", self.id);
                EngineResult::Delivered
            }
            Err(mpsc::TryRecvError::Disconnected) => {
                log::error!("Response channel disconnected");
                EngineResult::Error(EngineError::Disconnected)
            }
        }
    }
}

/// Inference engine that owns a model on a dedicated worker thread.
///
/// Requests are served one at a time in submission order. Each request gets
/// its own reply channel, so concurrent callers never observe each other's
/// results. A failing request does not stop the worker; a panicking model
/// does, and the engine then reports itself as no longer running.
pub struct InferenceEngine<M: InferenceModel + Send + 'static>
where
    M::Request: Send + RequestMetadata + 'static,
    M::Response: Send + 'static,
{
    state: Arc<Mutex<EngineState>>,
    req_tx: Option<mpsc::Sender<EngineRequest<M>>>,
    inference_handle: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    id_counter: AtomicU64,
}

impl<M: InferenceModel + Send + 'static> InferenceEngine<M>
where
    M::Request: Send + RequestMetadata + 'static,
    M::Response: Send + 'static,
{
    /// Creates a new inference engine and moves the model onto its worker thread.
    pub fn new(mut model: M) -> Self {
        let (req_tx, req_rx) = mpsc::channel::<EngineRequest<M>>();
        let state = Arc::new(Mutex::new(EngineState::Idle));
        let running = Arc::new(AtomicBool::new(true));

        let inference_handle = std::thread::spawn({
            let state = state.clone();
            let running = running.clone();
            move || {
                while let Ok(req) = req_rx.recv() {
                    log::debug!("Scheduling inference #{}", req.id);

                    // Extract lightweight metadata before consuming the request
                    let request_metadata = req.request.metadata();

                    write_state(&state, EngineState::Processing);
                    let start_time = Instant::now();

                    let outcome = catch_unwind(AssertUnwindSafe(|| model.run(req.request)));

                    let reply = match outcome {
                        Err(_) => {
                            log::error!("Inference #{} panicked, stopping the worker", req.id);
                            // flag first so callers that see the reply also see a dead engine
                            running.store(false, Ordering::SeqCst);
                            write_state(&state, EngineState::Idle);
                            let _ = req.reply.send(Err(EngineError::WorkerPanicked));
                            break;
                        }
                        Ok(Ok(response)) => {
                            log::debug!("Inference #{} completed", req.id);
                            Ok(EngineResponse {
                                id: req.id,
                                start_time,
                                duration: start_time.elapsed(),
                                request_metadata,
                                response,
                            })
                        }
                        Ok(Err(e)) => {
                            log::error!("Inference #{} failed: {e}", req.id);
                            Err(EngineError::Model(e))
                        }
                    };

                    write_state(&state, EngineState::Idle);

                    // the submitter may have given up waiting
                    let _ = req.reply.send(reply);
                }
                running.store(false, Ordering::SeqCst);
                log::debug!("Inference worker shutting down");
            }
        });

        Self {
            state,
            req_tx: Some(req_tx),
            inference_handle: Some(inference_handle),
            running,
            id_counter: AtomicU64::new(0),
        }
    }

    /// Returns the current state of the inference engine.
    pub fn state(&self) -> EngineState {
        read_state(&self.state)
    }

    /// Whether the worker thread is still accepting requests.
    pub fn is_running(&self) -> bool {
        self.req_tx.is_some() && self.running.load(Ordering::SeqCst)
    }

    /// Queues a request for the worker thread.
    pub fn submit(
        &self,
        request: M::Request,
    ) -> Result<PendingInference<M>, EngineError<M::Error>> {
        let tx = self.req_tx.as_ref().ok_or(EngineError::Stopped)?;
        let id = self.id_counter.fetch_add(1, Ordering::Relaxed);
        let (reply, rx) = mpsc::channel();

        tx.send(EngineRequest { id, request, reply })
            .map_err(|_| EngineError::Disconnected)?;

        Ok(PendingInference {
            id,
            state: self.state.clone(),
            rx,
            delivered: Cell::new(false),
        })
    }

    /// Queues a request and blocks until it has been answered.
    pub fn infer(&self, request: M::Request) -> EngineReply<M> {
        self.submit(request)?.wait()
    }

    /// Stops the inference engine and waits for the worker to drain its queue.
    pub fn stop(&mut self) {
        self.req_tx.take();
        if let Some(handle) = self.inference_handle.take() {
            let _ = handle.join();
        }
    }
}

impl<M: InferenceModel + Send + 'static> Drop for InferenceEngine<M>
where
    M::Request: Send + RequestMetadata + 'static,
    M::Response: Send + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}

fn read_state(state: &Mutex<EngineState>) -> EngineState {
    state.lock().unwrap_or_else(|e| e.into_inner()).clone()
}

fn write_state(state: &Mutex<EngineState>, value: EngineState) {
    *state.lock().unwrap_or_else(|e| e.into_inner()) = value;
}
