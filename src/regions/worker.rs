use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::foundation::error::{CompositorError, CompositorResult};
use crate::regions::finder::{RegionFinderOpts, find_regions_cancellable};
use crate::regions::protocol::{
    AnalysisFailed, FindRegionsRequest, RegionsFound, WorkerRequest, WorkerResponse,
};

/// A worker message tagged with the render generation that produced it.
#[derive(Debug)]
pub struct Envelope<T> {
    pub generation: u64,
    pub message: T,
}

/// Dedicated thread running region analysis, reached only through message passing.
pub struct RegionWorker {
    requests: Option<mpsc::Sender<Envelope<WorkerRequest>>>,
    responses: mpsc::Receiver<Envelope<WorkerResponse>>,
    cancel: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl RegionWorker {
    pub fn spawn() -> CompositorResult<Self> {
        let (req_tx, req_rx) = mpsc::channel::<Envelope<WorkerRequest>>();
        let (resp_tx, resp_rx) = mpsc::channel::<Envelope<WorkerResponse>>();
        let cancel = Arc::new(AtomicBool::new(false));

        let worker_cancel = Arc::clone(&cancel);
        let thread = std::thread::Builder::new()
            .name("photoframe-regions".to_string())
            .spawn(move || run(req_rx, resp_tx, &worker_cancel))
            .map_err(|e| CompositorError::region_analysis(format!("spawn worker thread: {e}")))?;

        Ok(Self {
            requests: Some(req_tx),
            responses: resp_rx,
            cancel,
            thread: Some(thread),
        })
    }

    pub fn is_alive(&self) -> bool {
        self.requests.is_some()
    }

    /// Send a request. The message, including its pixel buffer, is moved to the worker.
    pub fn post(&self, generation: u64, message: WorkerRequest) -> CompositorResult<()> {
        let tx = self.requests.as_ref().ok_or(CompositorError::Destroyed)?;
        tx.send(Envelope {
            generation,
            message,
        })
        .map_err(|_| CompositorError::region_analysis("worker thread has exited"))
    }

    /// Non-blocking receive.
    pub fn try_recv(&self) -> CompositorResult<Option<Envelope<WorkerResponse>>> {
        match self.responses.try_recv() {
            Ok(env) => Ok(Some(env)),
            Err(mpsc::TryRecvError::Empty) => Ok(None),
            Err(mpsc::TryRecvError::Disconnected) => Err(CompositorError::region_analysis(
                "worker thread has exited",
            )),
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> CompositorResult<Envelope<WorkerResponse>> {
        self.responses.recv_timeout(timeout).map_err(|e| match e {
            mpsc::RecvTimeoutError::Timeout => CompositorError::region_analysis(format!(
                "no response from worker within {timeout:?}"
            )),
            mpsc::RecvTimeoutError::Disconnected => {
                CompositorError::region_analysis("worker thread has exited")
            }
        })
    }

    /// Cancel any running analysis, close the request channel and join the thread.
    ///
    /// Queued requests are never started; responses still in flight are dropped.
    pub fn terminate(&mut self) {
        self.cancel.store(true, Ordering::Relaxed);
        self.requests = None;
        if let Some(handle) = self.thread.take()
            && handle.join().is_err()
        {
            tracing::warn!("region worker thread panicked");
        }
    }
}

impl Drop for RegionWorker {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn run(
    requests: mpsc::Receiver<Envelope<WorkerRequest>>,
    responses: mpsc::Sender<Envelope<WorkerResponse>>,
    cancel: &AtomicBool,
) {
    for env in requests {
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        let message = handle(env.message, cancel);
        if cancel.load(Ordering::Relaxed) {
            break;
        }
        if responses
            .send(Envelope {
                generation: env.generation,
                message,
            })
            .is_err()
        {
            break;
        }
    }
}

fn handle(request: WorkerRequest, cancel: &AtomicBool) -> WorkerResponse {
    match request {
        WorkerRequest::FindRegions(FindRegionsRequest {
            pixel_buffer,
            width,
            height,
            min_region_size,
            block_size,
        }) => {
            let opts = RegionFinderOpts {
                min_region_size,
                block_size,
            };
            match find_regions_cancellable(&pixel_buffer, width, height, opts, cancel) {
                Ok(regions) => WorkerResponse::RegionsFound(RegionsFound { regions }),
                Err(e) => WorkerResponse::AnalysisFailed(AnalysisFailed {
                    message: e.to_string(),
                }),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(buf: Vec<u8>, w: u32, h: u32) -> WorkerRequest {
        WorkerRequest::FindRegions(FindRegionsRequest {
            pixel_buffer: buf,
            width: w,
            height: h,
            min_region_size: 10,
            block_size: 4,
        })
    }

    #[test]
    fn round_trip_keeps_generation() {
        let worker = RegionWorker::spawn().unwrap();
        worker.post(7, request(vec![0; 32 * 32 * 4], 32, 32)).unwrap();
        let env = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(env.generation, 7);
        let WorkerResponse::RegionsFound(found) = env.message else {
            panic!("expected REGIONS_FOUND");
        };
        assert_eq!(found.regions.len(), 1);
        assert_eq!((found.regions[0].width(), found.regions[0].height()), (31, 31));
    }

    #[test]
    fn bad_buffer_reports_failure_message() {
        let worker = RegionWorker::spawn().unwrap();
        worker.post(1, request(vec![0; 3], 32, 32)).unwrap();
        let env = worker.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(env.message, WorkerResponse::AnalysisFailed(_)));
    }

    #[test]
    fn terminated_worker_refuses_requests() {
        let mut worker = RegionWorker::spawn().unwrap();
        worker.terminate();
        assert!(!worker.is_alive());
        assert!(matches!(
            worker.post(1, request(vec![0; 4], 1, 1)),
            Err(CompositorError::Destroyed)
        ));
        assert!(worker.try_recv().is_err());
    }

    #[test]
    fn terminate_interrupts_running_analysis() {
        let (w, h) = (4000u32, 3000u32);
        let mut worker = RegionWorker::spawn().unwrap();
        worker
            .post(1, request(vec![0; (w * h * 4) as usize], w, h))
            .unwrap();
        worker
            .post(2, request(vec![0; (w * h * 4) as usize], w, h))
            .unwrap();
        std::thread::sleep(Duration::from_millis(20));

        let started = std::time::Instant::now();
        worker.terminate();
        assert!(
            started.elapsed() < Duration::from_millis(500),
            "terminate took {:?}",
            started.elapsed()
        );
        assert!(!worker.is_alive());
    }

    #[test]
    fn idle_worker_times_out() {
        let worker = RegionWorker::spawn().unwrap();
        assert!(worker.try_recv().unwrap().is_none());
        let err = worker.recv_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, CompositorError::RegionAnalysis(_)));
    }
}
