use crate::io::read_json_opt;
use crate::{ArtifactWriter, ProfileLayout, Result};
use auditgraph_protocol::ProvenanceRecord;
use std::collections::HashSet;

impl ArtifactWriter<'_> {
    /// Appends to `provenance/<run_id>.json`. Records already present are not written
    /// twice, so replaying a stage leaves the ledger unchanged. Returns how many were new.
    pub fn append_provenance(
        &mut self,
        run_id: &str,
        records: Vec<ProvenanceRecord>,
    ) -> Result<usize> {
        let path = self.layout().provenance_path(run_id);
        let mut existing = load_provenance(self.layout(), run_id)?;
        let mut seen: HashSet<ProvenanceRecord> = existing.iter().cloned().collect();

        let before = existing.len();
        for record in records {
            // Compare in stored (redacted) form.
            let record = self.redact_record(&record)?;
            if seen.insert(record.clone()) {
                existing.push(record);
            }
        }
        let added = existing.len() - before;
        if added > 0 || !path.exists() {
            self.write_json(&path, &existing)?;
        }
        log::debug!("Provenance for {run_id}: {added} new records");
        Ok(added)
    }
}

pub fn load_provenance(layout: &ProfileLayout, run_id: &str) -> Result<Vec<ProvenanceRecord>> {
    Ok(read_json_opt(&layout.provenance_path(run_id))?.unwrap_or_default())
}
