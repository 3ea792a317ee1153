//! Datasources shipped with the crate, looked up by name.

mod activity_progress;
mod participants;

pub use activity_progress::ActivityProgress;
pub use participants::Participants;

use crate::report::Datasource;

/// Every shipped datasource, in listing order.
pub fn all() -> Vec<Box<dyn Datasource>> {
    vec![Box::new(Participants), Box::new(ActivityProgress)]
}

pub fn by_name(name: &str) -> Option<Box<dyn Datasource>> {
    all().into_iter().find(|ds| ds.name() == name)
}
