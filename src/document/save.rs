//! Encoding whole files.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use super::load::{has_separator, END_OF_FILE, TOP_LEVEL_OBJECT};
use super::{Document, BLOCK_TYPE};
use crate::codec::NifWriter;
use crate::model::ItemId;
use crate::util::{Result, V10_0_0_0, V3_3_0_13};
use crate::value::string_to_latin1;

fn write_name<W: Write>(w: &mut NifWriter<W>, name: &str) -> Result<()> {
    let bytes = string_to_latin1(name);
    w.write_i32(bytes.len() as i32)?;
    w.write_bytes(&bytes)
}

impl Document {
    /// Encode the document. Header tables and footer roots are refreshed first.
    pub fn save<W: Write>(&mut self, out: W) -> Result<()> {
        let span = tracing::info_span!("save", blocks = self.block_count());
        let _enter = span.enter();

        self.refresh_header();
        self.refresh_links();
        self.refresh_footer();

        let mut w = NifWriter::new(out, self.flags);
        let root = self.root();
        let rows = self.tree.children(root).to_vec();
        for (c, &row) in rows.iter().enumerate() {
            if self.type_name_of(row) == BLOCK_TYPE {
                self.write_block_prefix(&mut w, c, row)?;
            }
            self.save_item(&mut w, row)?;
        }
        if self.version < V3_3_0_13 {
            write_name(&mut w, END_OF_FILE)?;
        }
        w.flush()?;
        tracing::info!("saved {} bytes", w.pos());
        Ok(())
    }

    pub fn save_to_vec(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.save(&mut out)?;
        Ok(out)
    }

    pub fn save_path(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let file = File::create(path.as_ref())?;
        self.save(BufWriter::new(file))
    }

    /// Separator or inline type name written ahead of root row `c`.
    fn write_block_prefix<W: Write>(&self, w: &mut NifWriter<W>, c: usize, block: ItemId) -> Result<()> {
        let name = self.tree.name(block);
        if self.version > V10_0_0_0 {
            if has_separator(self.version, name) {
                w.write_u32(0)?;
            }
            return Ok(());
        }
        let legacy = self.version < V3_3_0_13;
        if legacy && self.root_links().contains(&(c as i32 - 1)) {
            write_name(w, TOP_LEVEL_OBJECT)?;
        }
        write_name(w, name)?;
        if legacy {
            w.write_i32(c as i32)?;
        }
        Ok(())
    }

    fn save_item<W: Write>(&self, w: &mut NifWriter<W>, id: ItemId) -> Result<()> {
        for &c in self.tree.children(id) {
            let Some(item) = self.tree.get(c) else { continue };
            if item.is_abstract() || !self.eval_condition(c, false) {
                continue;
            }
            if item.is_array() || item.child_count() > 0 {
                self.save_item(w, c)?;
            } else {
                w.write(item.value())?;
            }
        }
        Ok(())
    }
}
