#![allow(dead_code)]

pub mod graphs;
pub mod shortest_path;
pub mod virtual_network;
