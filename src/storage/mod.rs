pub mod catalog;
pub mod container;
pub mod container_map;
pub mod end_point;
pub mod end_point_map;

pub use catalog::{Catalog, ClassDefinition, EndPointKind, RelationEndPointDefinition};
pub use container::{ContainerState, DataContainer};
pub use container_map::DataContainerMap;
pub use end_point::{
    RealObjectEndPoint, RelationEndPoint, VirtualCollectionEndPoint, VirtualObjectEndPoint,
};
pub use end_point_map::RelationEndPointMap;
