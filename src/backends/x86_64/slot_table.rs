use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::ir::ir_nodes::IrFunction;
use crate::return_codegen_error;
use crate::settings::SLOT_SIZE_BYTES;
use rustc_hash::FxHashMap;

/// Stack offsets for every slot a function allocates.
///
/// Slots are found from the function's `alloca` instructions and laid out
/// contiguously below `%rbp` in the order they are allocated: the first slot is at -8,
/// the second at -16 and so on. Every slot takes 8 bytes even though only 4 are written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotTable {
    offsets: FxHashMap<String, i32>,
    order: Vec<String>,
}

impl SlotTable {
    pub fn from_function(function: &IrFunction) -> Result<SlotTable, CompilerError> {
        let mut offsets = FxHashMap::default();
        let mut order = Vec::new();

        for slot in function.slots() {
            let offset = -SLOT_SIZE_BYTES * (order.len() as i32 + 1);

            if offsets.insert(slot.to_owned(), offset).is_some() {
                return_codegen_error!(
                    format!("Slot '%{slot}' is allocated twice in '{}'", function.name),
                    {
                        CompilationStage => "Codegen",
                    }
                )
            }

            order.push(slot.to_owned());
        }

        Ok(SlotTable { offsets, order })
    }

    pub fn offset(&self, slot: &str) -> Option<i32> {
        self.offsets.get(slot).copied()
    }

    /// Slot names with their offsets, in allocation order
    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.order
            .iter()
            .map(|slot| (slot.as_str(), self.offsets[slot]))
    }

    /// Bytes reserved below `%rbp` by the prologue
    pub fn frame_size(&self) -> i32 {
        self.order.len() as i32 * SLOT_SIZE_BYTES
    }
}
