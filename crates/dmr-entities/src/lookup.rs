use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use dmr_core::defines::ID_ALL_CALL;

/// Turns radio and talkgroup ids into display names for the log
pub trait IdLookup: Send + Sync {
    fn find(&self, id: u32) -> String;
}

/// Id to callsign table, read from "id callsign [name..]" lines. Fields may be
/// separated by whitespace, tabs or commas; `#` starts a comment line.
#[derive(Debug, Clone, Default)]
pub struct TableLookup {
    table: HashMap<u32, String>,
}

impl TableLookup {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let f = File::open(path)?;
        let mut lookup = TableLookup::default();
        for line in BufReader::new(f).lines() {
            lookup.add_line(&line?);
        }
        tracing::info!("loaded {} ids", lookup.len());
        Ok(lookup)
    }

    pub fn from_lines(text: &str) -> Self {
        let mut lookup = TableLookup::default();
        text.lines().for_each(|l| lookup.add_line(l));
        lookup
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn add_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return;
        }
        let mut fields = line.split(|c: char| c.is_whitespace() || c == ',').filter(|f| !f.is_empty());
        let (Some(id), Some(callsign)) = (fields.next(), fields.next()) else {
            tracing::debug!("skipping id line {:?}", line);
            return;
        };
        match id.parse::<u32>() {
            Ok(id) => {
                self.table.insert(id, callsign.to_uppercase());
            }
            Err(_) => tracing::debug!("skipping id line {:?}", line),
        }
    }
}

impl IdLookup for TableLookup {
    fn find(&self, id: u32) -> String {
        if id == ID_ALL_CALL {
            return "ALL".to_string();
        }
        match self.table.get(&id) {
            Some(callsign) => callsign.clone(),
            None => id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let lookup = TableLookup::from_lines("# DMR ids\n2345678\tg4klx\tJonathan\n1234567,PD0ABC,Piet\n\nbogus line\n");
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.find(2345678), "G4KLX");
        assert_eq!(lookup.find(1234567), "PD0ABC");
        assert_eq!(lookup.find(91), "91");
        assert_eq!(lookup.find(0xFFFFFF), "ALL");
    }
}
