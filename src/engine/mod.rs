mod stroke;
pub use stroke::*;

mod tile;
pub use tile::*;

mod clip;
pub use clip::*;

mod atlas;
pub use atlas::*;

mod store;
pub use store::*;

mod session;
pub use session::*;

mod whiteboard;
pub use whiteboard::*;
