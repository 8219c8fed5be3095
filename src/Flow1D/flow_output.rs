use super::StFlow::StFlow;
use super::flow_error::FlowError;
use prettytable::{Cell, Row, Table, row};

impl StFlow {
    /// grid, active main components and species per point
    pub fn solution_table(&self, x: &[f64]) -> Result<Table, FlowError> {
        if x.len() != self.size() {
            return Err(FlowError::SizeMismatch(format!(
                "state of domain '{}' has length {}, expected {}",
                self.id,
                x.len(),
                self.size()
            )));
        }
        let active: Vec<usize> = (0..self.n_components())
            .filter(|&n| self.component_active(n))
            .collect();
        let mut table = Table::new();
        let mut header = vec![Cell::new("z")];
        header.extend(active.iter().map(|&n| Cell::new(&self.component_name(n))));
        table.add_row(Row::new(header));
        for j in 0..self.n_points() {
            let mut cells = vec![Cell::new(&format!("{:.6e}", self.z(j)))];
            cells.extend(
                active
                    .iter()
                    .map(|&n| Cell::new(&format!("{:.6e}", x[self.index(n, j)]))),
            );
            table.add_row(Row::new(cells));
        }
        Ok(table)
    }

    /// radiative heat loss per point; empty header only when radiation is off
    pub fn radiation_table(&self) -> Table {
        let mut table = Table::new();
        table.add_row(row!["z", "radiative heat loss"]);
        if self.do_radiation {
            for j in 0..self.n_points() {
                table.add_row(row![
                    format!("{:.6e}", self.z(j)),
                    format!("{:.6e}", self.qdot_radiation[j])
                ]);
            }
        }
        table
    }

    /// Prints the pressure, the solution table and, with radiation on, the heat losses
    pub fn show(&self, x: &[f64]) -> Result<(), FlowError> {
        let mut header = Table::new();
        header.add_row(row!["domain", self.id]);
        header.add_row(row!["type", self.domain_type()]);
        header.add_row(row!["pressure, Pa", format!("{:.4e}", self.press)]);
        header.printstd();
        self.solution_table(x)?.printstd();
        if self.do_radiation {
            self.radiation_table().printstd();
        }
        Ok(())
    }
}
