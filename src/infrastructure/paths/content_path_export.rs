use crate::application::ports::ContentPathExportStrategy;

const CONTENT_DIR: &str = "content";
const SCHEMA_DIR: &str = "schema";
const TABLE_DIR: &str = "table";
const LOB_DIR: &str = "lob";
const TABLE_FILENAME: &str = "table";
const LOB_FILENAME: &str = "record";
const CLOB_EXTENSION: &str = "txt";
const BLOB_EXTENSION: &str = "bin";

/// Utility for generating positional archive paths:
/// `content/schema{S}/table{T}/lob{C}/record{R}.bin`
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexedContentPathStrategy;

impl IndexedContentPathStrategy {
    pub fn new() -> Self {
        Self
    }

    fn table_dir(&self, schema_index: usize, table_index: usize) -> String {
        format!(
            "{}/{}/{}",
            CONTENT_DIR,
            self.schema_folder_name(schema_index),
            self.table_folder_name(table_index)
        )
    }

    fn lob_file_path(
        &self,
        schema_index: usize,
        table_index: usize,
        column_index: usize,
        file_name: String,
    ) -> String {
        format!(
            "{}/{}/{}",
            self.table_dir(schema_index, table_index),
            self.column_folder_name(column_index),
            file_name
        )
    }
}

impl ContentPathExportStrategy for IndexedContentPathStrategy {
    fn schema_folder_name(&self, schema_index: usize) -> String {
        format!("{}{}", SCHEMA_DIR, schema_index)
    }

    fn table_folder_name(&self, table_index: usize) -> String {
        format!("{}{}", TABLE_DIR, table_index)
    }

    fn column_folder_name(&self, column_index: usize) -> String {
        format!("{}{}", LOB_DIR, column_index)
    }

    fn clob_file_name(&self, row_index: u64) -> String {
        format!("{}{}.{}", LOB_FILENAME, row_index, CLOB_EXTENSION)
    }

    fn blob_file_name(&self, row_index: u64) -> String {
        format!("{}{}.{}", LOB_FILENAME, row_index, BLOB_EXTENSION)
    }

    fn clob_file_path(
        &self,
        schema_index: usize,
        table_index: usize,
        column_index: usize,
        row_index: u64,
    ) -> String {
        self.lob_file_path(
            schema_index,
            table_index,
            column_index,
            self.clob_file_name(row_index),
        )
    }

    fn blob_file_path(
        &self,
        schema_index: usize,
        table_index: usize,
        column_index: usize,
        row_index: u64,
    ) -> String {
        self.lob_file_path(
            schema_index,
            table_index,
            column_index,
            self.blob_file_name(row_index),
        )
    }

    fn table_xml_file_path(&self, schema_index: usize, table_index: usize) -> String {
        format!(
            "{}/{}{}.xml",
            self.table_dir(schema_index, table_index),
            TABLE_FILENAME,
            table_index
        )
    }

    fn table_xsd_file_path(&self, schema_index: usize, table_index: usize) -> String {
        format!(
            "{}/{}",
            self.table_dir(schema_index, table_index),
            self.table_xsd_file_name(table_index)
        )
    }

    fn table_xsd_namespace(&self, base: &str, schema_index: usize, table_index: usize) -> String {
        format!(
            "{}{}{}/{}",
            base,
            SCHEMA_DIR,
            schema_index,
            self.table_xsd_file_name(table_index)
        )
    }

    fn table_xsd_file_name(&self, table_index: usize) -> String {
        format!("{}{}.xsd", TABLE_FILENAME, table_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_paths() {
        let paths = IndexedContentPathStrategy::new();
        assert_eq!(
            paths.table_xml_file_path(1, 2),
            "content/schema1/table2/table2.xml"
        );
        assert_eq!(
            paths.table_xsd_file_path(1, 2),
            "content/schema1/table2/table2.xsd"
        );
    }

    #[test]
    fn test_lob_paths() {
        let paths = IndexedContentPathStrategy::new();
        assert_eq!(
            paths.blob_file_path(1, 1, 3, 42),
            "content/schema1/table1/lob3/record42.bin"
        );
        assert_eq!(
            paths.clob_file_path(2, 5, 1, 7),
            "content/schema2/table5/lob1/record7.txt"
        );
    }

    #[test]
    fn test_xsd_namespace() {
        let paths = IndexedContentPathStrategy::new();
        assert_eq!(
            paths.table_xsd_namespace("http://www.admin.ch/xmlns/siard/2.2/", 1, 3),
            "http://www.admin.ch/xmlns/siard/2.2/schema1/table3.xsd"
        );
    }
}
