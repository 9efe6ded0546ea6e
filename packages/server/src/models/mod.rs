pub mod hackathon;
pub mod shared;
