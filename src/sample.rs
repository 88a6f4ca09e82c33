use crate::{Result, Table};

pub const SAMPLE_CSV: &str = "\
Fund Name,Investment Strategy,Management Fee,Brokerage Fee,January,February,March,April,May,June,SAPY_January,SAPY_February,SAPY_March,SAPY_April,SAPY_May,SAPY_June
Growth Port,Value Investing,1.5%,0.6%,-0.1%,0.94%,8.49%,1.46%,-1.85%,-1.56%,-3.0%,1.6%,7.1%,1.7%,-4.09%,-4.09%
Hedefine,Growth Investing,1.2%,0.5%,0.5%,1.2%,7.8%,2.1%,-1.2%,-1.0%,-2.5%,2.0%,6.5%,2.5%,-3.5%,-3.8%
New Europe Property,Real Estate,1.0%,0.7%,-0.8%,0.7%,9.2%,1.0%,-2.2%,-1.7%,-3.2%,1.2%,8.0%,1.9%,-4.5%,-4.2%
";

pub fn sample_table() -> Result<Table> {
    Table::from_csv_bytes(SAMPLE_CSV.as_bytes())
}
