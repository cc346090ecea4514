//! The camera screen workflow
//!
//! [`WorkflowController`] owns the current picture and its props and drives
//! the capture, compose, upload and register sequence. The collaborators it
//! talks to are handed over when the screen is entered and released when the
//! controller is dropped.

use log::{debug, error, info, warn};

use super::config::Action;
use super::state::{WorkflowPhase, WorkflowState};
use crate::capture::{CaptureProvider, Picture};
use crate::editor::{CompositeRenderer, PlacementChange, PropOverlay};
use crate::error::{Result, WorkflowError};
use crate::register::{PhotoRecord, RegistrationClient};
use crate::upload::UploadClient;

/// Sends the user back to where they came from
pub trait Navigator: Send + Sync {
    fn go_back(&self);
}

/// Shows a failure to the user
pub trait Alert: Send + Sync {
    fn alert(&self, message: &str);
}

/// Everything the controller needs from the outside world
pub struct Collaborators {
    pub camera: Box<dyn CaptureProvider>,
    pub renderer: Box<dyn CompositeRenderer>,
    pub uploader: Box<dyn UploadClient>,
    pub registrar: Box<dyn RegistrationClient>,
    pub navigator: Box<dyn Navigator>,
    pub alert: Box<dyn Alert>,
}

pub struct WorkflowController {
    state: WorkflowState,
    camera: Box<dyn CaptureProvider>,
    renderer: Box<dyn CompositeRenderer>,
    uploader: Box<dyn UploadClient>,
    registrar: Box<dyn RegistrationClient>,
    navigator: Box<dyn Navigator>,
    alert: Box<dyn Alert>,
}

impl WorkflowController {
    /// Enter the camera screen, taking ownership of its collaborators
    pub fn enter(collaborators: Collaborators, prop_limit: usize) -> Self {
        debug!("Entering camera screen");
        let Collaborators {
            camera,
            renderer,
            uploader,
            registrar,
            navigator,
            alert,
        } = collaborators;

        Self {
            state: WorkflowState::new(prop_limit),
            camera,
            renderer,
            uploader,
            registrar,
            navigator,
            alert,
        }
    }

    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.state.phase()
    }

    pub fn can_perform(&self, action: Action) -> bool {
        action.is_available(self.state.phase())
    }

    fn require(&self, action: Action) -> Result<()> {
        let phase = self.state.phase();
        if action == Action::Upload && phase == WorkflowPhase::Uploading {
            return Err(WorkflowError::UploadInProgress);
        }
        if !action.is_available(phase) {
            return Err(WorkflowError::InvalidState { action, phase });
        }
        Ok(())
    }

    /// Take a picture and open the preview on it
    ///
    /// On failure nothing changes.
    pub async fn capture(&mut self) -> Result<Picture> {
        self.require(Action::Capture)?;
        let picture = self.camera.capture().await?;
        info!("Captured picture {:?}", picture.path);
        self.state.set_picture(picture.clone());
        Ok(picture)
    }

    /// Add a prop on top of the others, returning its index
    pub fn add_prop(&mut self, prop: PropOverlay) -> Result<usize> {
        self.require(Action::AddProp)?;
        debug!("Adding prop {:?}", prop.source);
        self.state.props_mut().add(prop)
    }

    pub fn transform_prop(&mut self, index: usize, change: PlacementChange) -> Result<()> {
        self.require(Action::TransformProp)?;
        let prop = self
            .state
            .props_mut()
            .get_mut(index)
            .ok_or(WorkflowError::NoSuchProp(index))?;
        prop.placement.apply(change);
        debug!("Prop {} placement now {:?}", index, prop.placement);
        Ok(())
    }

    /// Drop the current picture and its props without uploading
    pub fn close_preview(&mut self) -> Result<()> {
        self.require(Action::ClosePreview)?;
        self.state.close_preview();
        Ok(())
    }

    /// Flatten, upload and register the current picture
    ///
    /// A failed composition falls back to the bare picture. Upload and
    /// registration failures are shown to the user and leave the preview
    /// open so the upload can be retried. On success the caller is sent back
    /// and the workflow state is discarded.
    pub async fn upload(&mut self) -> Result<PhotoRecord> {
        self.require(Action::Upload)?;
        let picture = self
            .state
            .picture()
            .cloned()
            .ok_or(WorkflowError::InvalidState {
                action: Action::Upload,
                phase: self.state.phase(),
            })?;
        let props = self.state.props().as_slice().to_vec();

        let guard = UploadGuard::begin(&mut self.state);
        let outcome = run_pipeline(
            self.renderer.as_ref(),
            self.uploader.as_ref(),
            self.registrar.as_ref(),
            &picture,
            &props,
        )
        .await;

        match outcome {
            Ok(photo) => {
                guard.complete();
                self.navigator.go_back();
                Ok(photo)
            }
            Err(e) => {
                drop(guard);
                error!("Upload of {:?} failed: {}", picture.path, e);
                self.alert.alert(&e.to_string());
                Err(e)
            }
        }
    }

    /// Leave the camera screen without completing, releasing its handles
    pub fn leave(self) {
        debug!("Leaving camera screen in phase {}", self.state.phase());
    }
}

impl Drop for WorkflowController {
    fn drop(&mut self) {
        debug!("Releasing camera and renderer handles");
    }
}

/// Holds the state in `Uploading` and puts it back on every way out
struct UploadGuard<'a> {
    state: &'a mut WorkflowState,
}

impl<'a> UploadGuard<'a> {
    fn begin(state: &'a mut WorkflowState) -> Self {
        state.begin_upload();
        Self { state }
    }

    fn complete(self) {
        self.state.complete();
    }
}

impl Drop for UploadGuard<'_> {
    fn drop(&mut self) {
        self.state.end_upload();
    }
}

/// Compose, then upload, then register, strictly in that order
async fn run_pipeline(
    renderer: &dyn CompositeRenderer,
    uploader: &dyn UploadClient,
    registrar: &dyn RegistrationClient,
    picture: &Picture,
    props: &[PropOverlay],
) -> Result<PhotoRecord> {
    let artifact = match renderer.compose(picture, props).await {
        Ok(composite) => composite,
        Err(e) => {
            warn!("Composition failed, uploading photo without props: {}", e);
            picture.clone()
        }
    };

    let file_id = uploader.upload(&artifact).await?;

    let photo = registrar.register(&file_id).await.map_err(|e| {
        warn!("File {} is stored but no photo references it", file_id);
        e
    })?;

    info!("Photo {} saved", photo.id);
    Ok(photo)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CaptureError, CompositeError, RegistrationError, UploadError};
    use crate::upload::FileId;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    type Log = Arc<Mutex<Vec<String>>>;

    fn record(log: &Log, entry: String) {
        log.lock().unwrap().push(entry);
    }

    struct FakeCamera {
        results: Mutex<VecDeque<std::result::Result<Picture, CaptureError>>>,
    }

    #[async_trait]
    impl CaptureProvider for FakeCamera {
        async fn capture(&self) -> std::result::Result<Picture, CaptureError> {
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CaptureError::NoMonitor))
        }
    }

    enum RenderMode {
        Succeed,
        Fail,
        Hang,
    }

    struct FakeRenderer {
        mode: RenderMode,
        log: Log,
    }

    #[async_trait]
    impl CompositeRenderer for FakeRenderer {
        async fn compose(
            &self,
            base: &Picture,
            props: &[PropOverlay],
        ) -> std::result::Result<Picture, CompositeError> {
            record(
                &self.log,
                format!("compose {} +{}", base.path.display(), props.len()),
            );
            match self.mode {
                RenderMode::Succeed => Ok(Picture::new("/tmp/composite.jpg")),
                RenderMode::Fail => Err(CompositeError::Io(std::io::Error::other("snapshot"))),
                RenderMode::Hang => std::future::pending().await,
            }
        }
    }

    struct FakeUploader {
        fail: bool,
        log: Log,
    }

    #[async_trait]
    impl UploadClient for FakeUploader {
        async fn upload(&self, picture: &Picture) -> std::result::Result<FileId, UploadError> {
            record(&self.log, format!("upload {}", picture.path.display()));
            if self.fail {
                return Err(UploadError::Rejected {
                    status: 503,
                    body: "network unreachable".into(),
                });
            }
            Ok(FileId::new("f123"))
        }
    }

    struct FakeRegistrar {
        fail: bool,
        log: Log,
    }

    #[async_trait]
    impl RegistrationClient for FakeRegistrar {
        async fn register(
            &self,
            file_id: &FileId,
        ) -> std::result::Result<PhotoRecord, RegistrationError> {
            record(&self.log, format!("register {}", file_id));
            if self.fail {
                return Err(RegistrationError::GraphQl(vec!["denied".into()]));
            }
            Ok(PhotoRecord {
                id: "p1".into(),
                file: None,
            })
        }
    }

    struct FakeNavigator(Arc<AtomicUsize>);

    impl Navigator for FakeNavigator {
        fn go_back(&self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeAlert(Log);

    impl Alert for FakeAlert {
        fn alert(&self, message: &str) {
            record(&self.0, message.to_string());
        }
    }

    struct Harness {
        controller: WorkflowController,
        calls: Log,
        alerts: Log,
        back: Arc<AtomicUsize>,
    }

    impl Harness {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn alerts(&self) -> Vec<String> {
            self.alerts.lock().unwrap().clone()
        }

        fn back_count(&self) -> usize {
            self.back.load(Ordering::SeqCst)
        }

        fn prop_sources(&self) -> Vec<PathBuf> {
            self.controller
                .state()
                .props()
                .iter()
                .map(|p| p.source.clone())
                .collect()
        }
    }

    struct Setup {
        captures: Vec<std::result::Result<Picture, CaptureError>>,
        render: RenderMode,
        upload_fails: bool,
        register_fails: bool,
        prop_limit: usize,
    }

    impl Default for Setup {
        fn default() -> Self {
            Self {
                captures: vec![Ok(Picture::new("/tmp/a.jpg"))],
                render: RenderMode::Succeed,
                upload_fails: false,
                register_fails: false,
                prop_limit: 32,
            }
        }
    }

    fn harness(setup: Setup) -> Harness {
        let calls: Log = Arc::default();
        let alerts: Log = Arc::default();
        let back = Arc::new(AtomicUsize::new(0));

        let collaborators = Collaborators {
            camera: Box::new(FakeCamera {
                results: Mutex::new(setup.captures.into()),
            }),
            renderer: Box::new(FakeRenderer {
                mode: setup.render,
                log: calls.clone(),
            }),
            uploader: Box::new(FakeUploader {
                fail: setup.upload_fails,
                log: calls.clone(),
            }),
            registrar: Box::new(FakeRegistrar {
                fail: setup.register_fails,
                log: calls.clone(),
            }),
            navigator: Box::new(FakeNavigator(back.clone())),
            alert: Box::new(FakeAlert(alerts.clone())),
        };

        Harness {
            controller: WorkflowController::enter(collaborators, setup.prop_limit),
            calls,
            alerts,
            back,
        }
    }

    async fn previewing(setup: Setup) -> Harness {
        let mut h = harness(setup);
        h.controller.capture().await.expect("capture");
        h
    }

    #[tokio::test]
    async fn test_capture_opens_preview_with_no_props() {
        let mut h = harness(Setup::default());
        assert_eq!(h.controller.phase(), WorkflowPhase::Idle);

        let picture = h.controller.capture().await.expect("capture");

        assert_eq!(picture.path, PathBuf::from("/tmp/a.jpg"));
        assert_eq!(h.controller.phase(), WorkflowPhase::Previewing);
        assert!(h.controller.state().is_showing_preview());
        assert!(h.controller.state().props().is_empty());
    }

    #[tokio::test]
    async fn test_failed_capture_leaves_state_unchanged() {
        let mut h = harness(Setup {
            captures: vec![Err(CaptureError::Device("shutter jammed".into()))],
            ..Setup::default()
        });

        let result = h.controller.capture().await;

        assert!(matches!(result, Err(WorkflowError::Capture(_))));
        assert_eq!(h.controller.phase(), WorkflowPhase::Idle);
        assert!(!h.controller.state().is_showing_preview());
        assert!(h.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_recapture_replaces_picture_and_clears_props() {
        let mut h = previewing(Setup {
            captures: vec![Ok(Picture::new("/tmp/a.jpg")), Ok(Picture::new("/tmp/b.jpg"))],
            ..Setup::default()
        })
        .await;
        h.controller.add_prop(PropOverlay::new("hat.png")).expect("add");

        h.controller.capture().await.expect("second capture");

        assert_eq!(
            h.controller.state().picture().map(|p| p.path.clone()),
            Some(PathBuf::from("/tmp/b.jpg"))
        );
        assert!(h.controller.state().props().is_empty());
    }

    #[tokio::test]
    async fn test_add_prop_preserves_call_order() {
        let mut h = previewing(Setup::default()).await;
        let names = ["a.png", "b.png", "c.png", "a.png"];

        for (i, name) in names.iter().enumerate() {
            assert_eq!(h.controller.add_prop(PropOverlay::new(name)).expect("add"), i);
        }

        let expected: Vec<PathBuf> = names.iter().map(PathBuf::from).collect();
        assert_eq!(h.prop_sources(), expected);
    }

    #[tokio::test]
    async fn test_add_prop_requires_preview() {
        let mut h = harness(Setup::default());

        let result = h.controller.add_prop(PropOverlay::new("a.png"));

        assert!(matches!(
            result,
            Err(WorkflowError::InvalidState {
                action: Action::AddProp,
                phase: WorkflowPhase::Idle
            })
        ));
    }

    #[tokio::test]
    async fn test_add_prop_stops_at_limit() {
        let mut h = previewing(Setup {
            prop_limit: 2,
            ..Setup::default()
        })
        .await;
        h.controller.add_prop(PropOverlay::new("a.png")).expect("add");
        h.controller.add_prop(PropOverlay::new("b.png")).expect("add");

        let result = h.controller.add_prop(PropOverlay::new("c.png"));

        assert!(matches!(result, Err(WorkflowError::PropLimit { limit: 2 })));
        assert_eq!(h.controller.state().props().len(), 2);
    }

    #[tokio::test]
    async fn test_transform_prop_moves_only_that_prop() {
        let mut h = previewing(Setup::default()).await;
        h.controller.add_prop(PropOverlay::new("a.png")).expect("add");
        h.controller.add_prop(PropOverlay::new("b.png")).expect("add");

        h.controller
            .transform_prop(1, PlacementChange::MoveBy { dx: 12, dy: -3 })
            .expect("transform");

        let props = h.controller.state().props();
        assert_eq!(props.get(0).map(|p| (p.placement.x, p.placement.y)), Some((0, 0)));
        assert_eq!(props.get(1).map(|p| (p.placement.x, p.placement.y)), Some((12, -3)));
        assert!(matches!(
            h.controller.transform_prop(7, PlacementChange::SetScale(2.0)),
            Err(WorkflowError::NoSuchProp(7))
        ));
    }

    #[tokio::test]
    async fn test_close_preview_discards_everything() {
        for count in [0, 1, 5] {
            let mut h = previewing(Setup::default()).await;
            for _ in 0..count {
                h.controller.add_prop(PropOverlay::new("a.png")).expect("add");
            }

            h.controller.close_preview().expect("close");

            assert_eq!(h.controller.phase(), WorkflowPhase::Idle);
            assert!(h.controller.state().props().is_empty());
            assert!(h.controller.state().picture().is_none());
            assert!(!h.controller.state().is_showing_preview());
        }
    }

    #[tokio::test]
    async fn test_close_preview_requires_preview() {
        let mut h = harness(Setup::default());
        assert!(matches!(
            h.controller.close_preview(),
            Err(WorkflowError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_successful_upload_completes_and_goes_back_once() {
        let mut h = previewing(Setup::default()).await;
        h.controller.add_prop(PropOverlay::new("propA.png")).expect("add");

        let photo = h.controller.upload().await.expect("upload");

        assert_eq!(photo.id, "p1");
        assert_eq!(
            h.calls(),
            vec![
                "compose /tmp/a.jpg +1".to_string(),
                "upload /tmp/composite.jpg".to_string(),
                "register f123".to_string(),
            ]
        );
        assert_eq!(h.back_count(), 1);
        assert_eq!(h.controller.phase(), WorkflowPhase::Completed);
        assert!(!h.controller.state().is_uploading());
        assert!(h.controller.state().picture().is_none());
        assert!(h.controller.state().props().is_empty());
        assert!(h.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_composition_failure_uploads_original() {
        let mut h = previewing(Setup {
            render: RenderMode::Fail,
            ..Setup::default()
        })
        .await;
        h.controller.add_prop(PropOverlay::new("propA.png")).expect("add");

        h.controller.upload().await.expect("upload");

        assert_eq!(
            h.calls(),
            vec![
                "compose /tmp/a.jpg +1".to_string(),
                "upload /tmp/a.jpg".to_string(),
                "register f123".to_string(),
            ]
        );
        assert_eq!(h.back_count(), 1);
        assert!(h.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_upload_failure_returns_to_preview_without_registering() {
        let mut h = previewing(Setup {
            upload_fails: true,
            ..Setup::default()
        })
        .await;
        h.controller.add_prop(PropOverlay::new("propA.png")).expect("add");

        let result = h.controller.upload().await;

        assert!(matches!(result, Err(WorkflowError::Upload(_))));
        assert!(!h.calls().iter().any(|c| c.starts_with("register")));
        assert_eq!(h.controller.phase(), WorkflowPhase::Previewing);
        assert!(!h.controller.state().is_uploading());
        assert_eq!(h.prop_sources(), vec![PathBuf::from("propA.png")]);
        assert_eq!(h.back_count(), 0);
        assert_eq!(h.alerts().len(), 1);
        assert!(h.alerts()[0].contains("network unreachable"));
    }

    #[tokio::test]
    async fn test_registration_failure_returns_to_preview_without_going_back() {
        let mut h = previewing(Setup {
            register_fails: true,
            ..Setup::default()
        })
        .await;

        let result = h.controller.upload().await;

        assert!(matches!(result, Err(WorkflowError::Registration(_))));
        assert_eq!(h.controller.phase(), WorkflowPhase::Previewing);
        assert!(!h.controller.state().is_uploading());
        assert!(h.controller.state().picture().is_some());
        assert_eq!(h.back_count(), 0);
        assert_eq!(h.alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_retry_after_registration_failure_uploads_again() {
        let mut h = previewing(Setup {
            register_fails: true,
            ..Setup::default()
        })
        .await;

        assert!(h.controller.upload().await.is_err());
        assert!(h.controller.upload().await.is_err());

        let uploads = h.calls().iter().filter(|c| c.starts_with("upload")).count();
        assert_eq!(uploads, 2);
    }

    #[tokio::test]
    async fn test_upload_requires_preview() {
        let mut h = harness(Setup::default());

        let result = h.controller.upload().await;

        assert!(matches!(result, Err(WorkflowError::InvalidState { .. })));
        assert!(h.calls().is_empty());
        assert!(h.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_nothing_is_available_after_completion() {
        let mut h = previewing(Setup::default()).await;
        h.controller.upload().await.expect("upload");

        for action in Action::all() {
            assert!(!h.controller.can_perform(*action));
        }
        assert!(h.controller.upload().await.is_err());
        assert_eq!(h.back_count(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_upload_clears_in_progress_flag() {
        let mut h = previewing(Setup {
            render: RenderMode::Hang,
            ..Setup::default()
        })
        .await;

        let timed_out =
            tokio::time::timeout(Duration::from_millis(20), h.controller.upload()).await;

        assert!(timed_out.is_err());
        assert_eq!(h.controller.phase(), WorkflowPhase::Previewing);
        assert!(!h.controller.state().is_uploading());
        assert_eq!(h.back_count(), 0);
    }

    #[tokio::test]
    async fn test_actions_disabled_while_uploading() {
        let mut h = previewing(Setup::default()).await;
        h.controller.state.begin_upload();

        assert!(!h.controller.can_perform(Action::Upload));
        assert!(!h.controller.can_perform(Action::ClosePreview));
        assert!(matches!(
            h.controller.upload().await,
            Err(WorkflowError::UploadInProgress)
        ));
        assert!(matches!(
            h.controller.close_preview(),
            Err(WorkflowError::InvalidState { .. })
        ));
        assert!(h.calls().is_empty());
    }
}
