// Re-export key components
pub use crate::cluster::{Cluster, ClusterId, Phase, PixelBounds, advance, cluster};
pub use crate::geodesy::{
    geodetic_to_projected, geodetic_to_tile_pixel, projected_to_geodetic, tile_origin_pixels,
};
pub use crate::loading::{TransitModelConfig, create_transit_model, parse_timetable};
pub use crate::model::{DayType, Route, RouteKey, Schedule, Stop, StopTime, TransitModel};
pub use crate::relations::build_relationships;
pub use crate::schedule::{assign_schedules, generate_schedules};
pub use crate::vehicles::{ActiveVehicle, Heading, active_vehicles, active_vehicles_on_path};

// Core scalar types
pub use crate::Error;
pub use crate::Minutes;
