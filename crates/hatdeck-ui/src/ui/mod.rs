pub mod layout;
pub mod paging;
pub mod render;
pub mod sprites;
