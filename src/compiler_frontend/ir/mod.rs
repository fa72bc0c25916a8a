pub mod ir_builder;
pub mod ir_nodes;
pub mod ir_text;
