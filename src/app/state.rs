//! Workflow state types
//!
//! This module contains the data model of one capture, decorate and upload
//! workflow: the current picture, its props and the phase the screen is in.

use std::fmt;

use log::debug;

use crate::capture::Picture;
use crate::editor::PropList;

/// Where the workflow is in its lifecycle
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkflowPhase {
    /// No picture yet
    #[default]
    Idle,
    /// Picture captured and shown; props may be added
    Previewing,
    /// Upload in flight; the preview stays open
    Uploading,
    /// Photo saved, caller has been sent back
    Completed,
}

impl fmt::Display for WorkflowPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowPhase::Idle => write!(f, "idle"),
            WorkflowPhase::Previewing => write!(f, "previewing"),
            WorkflowPhase::Uploading => write!(f, "uploading"),
            WorkflowPhase::Completed => write!(f, "completed"),
        }
    }
}

/// State owned by the workflow controller
///
/// The picture and props always live and die together: the preview is
/// visible exactly when a picture is set.
#[derive(Clone, Debug, Default)]
pub struct WorkflowState {
    phase: WorkflowPhase,
    picture: Option<Picture>,
    props: PropList,
}

impl WorkflowState {
    /// Create an idle state whose prop list holds at most `prop_limit` props
    pub fn new(prop_limit: usize) -> Self {
        Self {
            phase: WorkflowPhase::Idle,
            picture: None,
            props: PropList::with_limit(prop_limit),
        }
    }

    pub fn phase(&self) -> WorkflowPhase {
        self.phase
    }

    pub fn picture(&self) -> Option<&Picture> {
        self.picture.as_ref()
    }

    pub fn props(&self) -> &PropList {
        &self.props
    }

    pub(crate) fn props_mut(&mut self) -> &mut PropList {
        &mut self.props
    }

    /// Whether the preview of the current picture is on screen
    pub fn is_showing_preview(&self) -> bool {
        self.picture.is_some()
    }

    pub fn is_uploading(&self) -> bool {
        self.phase == WorkflowPhase::Uploading
    }

    /// Replace the current picture, dropping props left from an earlier one
    pub(crate) fn set_picture(&mut self, picture: Picture) {
        debug!("Setting current picture to {:?}", picture.path);
        self.picture = Some(picture);
        self.props.clear();
        self.phase = WorkflowPhase::Previewing;
    }

    pub(crate) fn close_preview(&mut self) {
        debug!("Closing preview, discarding {} props", self.props.len());
        self.discard();
        self.phase = WorkflowPhase::Idle;
    }

    pub(crate) fn begin_upload(&mut self) {
        debug!("Upload started");
        self.phase = WorkflowPhase::Uploading;
    }

    /// Leave `Uploading` for `Previewing`; any other phase is kept
    pub(crate) fn end_upload(&mut self) {
        if self.phase == WorkflowPhase::Uploading {
            debug!("Upload finished without completing, back to preview");
            self.phase = WorkflowPhase::Previewing;
        }
    }

    pub(crate) fn complete(&mut self) {
        debug!("Workflow completed");
        self.discard();
        self.phase = WorkflowPhase::Completed;
    }

    fn discard(&mut self) {
        self.picture = None;
        self.props.clear();
    }
}
