//! Collaborators the navigator talks to but does not own the logic of.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use nalgebra::Vector3;

use crate::body::{BodyRef, BodyRegistry, StaticBodyRegistry};
use crate::location::{LocationDirectory, StaticLocationDirectory};
use crate::time::{Clock, SystemClock};

/// Object selection, as far as the navigator cares about it.
pub trait SelectionService {
    /// The selected object, when it is a body.
    fn selected_body(&self) -> Option<BodyRef>;
    fn clear_selection(&mut self);
}

/// Free-look movement handling.
pub trait MovementService {
    fn set_tracking(&mut self, tracking: bool);
}

/// Planet position computation.
pub trait SolarSystem {
    /// Recompute body positions for `jd`, as seen from an observer whose
    /// home body sits at `observer_body_position` (heliocentric ecliptic, AU).
    fn recompute_body_positions(&mut self, jd: f64, observer_body_position: Vector3<f64>);
}

impl<T: SelectionService> SelectionService for Rc<RefCell<T>> {
    fn selected_body(&self) -> Option<BodyRef> {
        self.borrow().selected_body()
    }
    fn clear_selection(&mut self) {
        self.borrow_mut().clear_selection();
    }
}

impl<T: MovementService> MovementService for Rc<RefCell<T>> {
    fn set_tracking(&mut self, tracking: bool) {
        self.borrow_mut().set_tracking(tracking);
    }
}

impl<T: SolarSystem> SolarSystem for Rc<RefCell<T>> {
    fn recompute_body_positions(&mut self, jd: f64, observer_body_position: Vector3<f64>) {
        self.borrow_mut().recompute_body_positions(jd, observer_body_position);
    }
}

// ---------- Stand-alone implementations ----------

/// Holds at most one selected body.
#[derive(Debug, Default, Clone)]
pub struct SingleSelection {
    pub selected: Option<BodyRef>,
}

impl SelectionService for SingleSelection {
    fn selected_body(&self) -> Option<BodyRef> {
        self.selected.clone()
    }

    fn clear_selection(&mut self) {
        self.selected = None;
    }
}

/// Remembers the tracking flag and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrackingFlag {
    pub tracking: bool,
}

impl MovementService for TrackingFlag {
    fn set_tracking(&mut self, tracking: bool) {
        self.tracking = tracking;
    }
}

/// Bodies never move; remembers the last request.
#[derive(Debug, Default, Clone, Copy)]
pub struct StaticSolarSystem {
    pub last_request: Option<(f64, Vector3<f64>)>,
}

impl SolarSystem for StaticSolarSystem {
    fn recompute_body_positions(&mut self, jd: f64, observer_body_position: Vector3<f64>) {
        self.last_request = Some((jd, observer_body_position));
    }
}

/// Everything a [`crate::Navigator`] needs from the outside world.
pub struct Services {
    pub locations: Box<dyn LocationDirectory>,
    pub bodies: Box<dyn BodyRegistry>,
    pub selection: Box<dyn SelectionService>,
    pub movement: Box<dyn MovementService>,
    pub solar_system: Box<dyn SolarSystem>,
    pub clock: Box<dyn Clock>,
}

impl Services {
    /// Built-in directory and bodies, system clock, inert selection and
    /// movement.
    pub fn standalone() -> Self {
        Self {
            locations: Box::new(StaticLocationDirectory::default()),
            bodies: Box::new(StaticBodyRegistry::solar_system()),
            selection: Box::new(SingleSelection::default()),
            movement: Box::new(TrackingFlag::default()),
            solar_system: Box::new(StaticSolarSystem::default()),
            clock: Box::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }
}

impl Default for Services {
    fn default() -> Self {
        Self::standalone()
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services").finish_non_exhaustive()
    }
}
