//! Props placed over the captured picture
//!
//! A [`PropList`] keeps overlays in the order they were added, which is also
//! the order they are drawn in.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::WorkflowError;

/// Where a prop sits on the base picture, in base-picture pixels
///
/// `x`/`y` locate the top-left corner of the unrotated, scaled prop.
/// Rotation is in degrees, clockwise, about the prop's centre.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub x: i64,
    pub y: i64,
    pub scale: f64,
    pub rotation: f64,
}

impl Default for Placement {
    fn default() -> Self {
        Self {
            x: 0,
            y: 0,
            scale: 1.0,
            rotation: 0.0,
        }
    }
}

impl Placement {
    pub fn at(x: i64, y: i64) -> Self {
        Self {
            x,
            y,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropOverlay {
    pub source: PathBuf,
    pub placement: Placement,
}

impl PropOverlay {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            placement: Placement::default(),
        }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn source(&self) -> &Path {
        &self.source
    }
}

/// Parses `PATH[@X,Y[,SCALE[,ROTATION]]]`
impl FromStr for PropOverlay {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let Some((path, placement)) = spec.rsplit_once('@') else {
            if spec.is_empty() {
                return Err("prop path is empty".to_string());
            }
            return Ok(Self::new(spec));
        };
        if path.is_empty() {
            return Err(format!("prop path is empty in '{}'", spec));
        }

        let fields: Vec<&str> = placement.split(',').map(str::trim).collect();
        if fields.len() < 2 || fields.len() > 4 {
            return Err(format!("expected X,Y[,SCALE[,ROTATION]] in '{}'", spec));
        }

        let coord = |s: &str| {
            s.parse::<i64>()
                .map_err(|e| format!("bad coordinate '{}': {}", s, e))
        };
        let number = |s: &str| {
            s.parse::<f64>()
                .map_err(|e| format!("bad number '{}': {}", s, e))
        };

        let mut result = Placement::at(coord(fields[0])?, coord(fields[1])?);
        if let Some(scale) = fields.get(2) {
            result.set_scale(number(scale)?);
        }
        if let Some(rotation) = fields.get(3) {
            result.set_rotation(number(rotation)?);
        }

        Ok(Self::new(path).with_placement(result))
    }
}

/// Props added to the current picture, in the order they were picked.
///
/// Order is z-order: later props are drawn on top of earlier ones.
#[derive(Clone, Debug)]
pub struct PropList {
    props: Vec<PropOverlay>,
    limit: usize,
}

impl Default for PropList {
    fn default() -> Self {
        Self::with_limit(DEFAULT_PROP_LIMIT)
    }
}

pub const DEFAULT_PROP_LIMIT: usize = 32;

impl PropList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            props: Vec::new(),
            limit,
        }
    }

    /// Append a prop, returning its index
    pub fn add(&mut self, prop: PropOverlay) -> Result<usize, WorkflowError> {
        if self.props.len() >= self.limit {
            return Err(WorkflowError::PropLimit { limit: self.limit });
        }
        self.props.push(prop);
        Ok(self.props.len() - 1)
    }

    pub fn clear(&mut self) {
        self.props.clear();
    }

    pub fn get(&self, index: usize) -> Option<&PropOverlay> {
        self.props.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut PropOverlay> {
        self.props.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PropOverlay> {
        self.props.iter()
    }

    pub fn as_slice(&self) -> &[PropOverlay] {
        &self.props
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn is_empty(&self) -> bool {
        self.props.is_empty()
    }

    pub fn len(&self) -> usize {
        self.props.len()
    }
}
