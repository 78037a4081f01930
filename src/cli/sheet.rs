use crate::cli::open_backend;
use crate::error::Result;
use crate::grid::Grid;
use crate::sheet::SheetView;

pub fn run() -> Result<()> {
    let mut backend = open_backend()?;
    let grid = Grid::load(&backend)?;
    let mut view = SheetView::new(grid);
    view.run(&mut backend)?;
    Ok(())
}
