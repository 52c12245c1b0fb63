pub mod reparent;
