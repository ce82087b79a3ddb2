//! Small hand-written input files.

/// 3x2 grid, NODATA 9999, one invalid cell at row 1 col 1.
pub const GRID_3X2: &str = "\
ncols         3
nrows         2
xllcorner     100.0
yllcorner     200.0
cellsize      10.0
NODATA_value  9999
1.5 2.5 3.5
4.5 9999 6.5
";

/// Two facets (2 + 1 triangles), the first with an attribute line.
pub const MESH_TWO_FACETS: &str = "\
scene demo
f1 2
0.0 0.0 1.0
c1
4
0 0 5
10 0 5
0 10 5
0 0 5
c2
3
10 0 5
10 10 5
0 10 5
f2 1
c3
4
20 0 7
30 0 7
20 10 7
20 0 7
";

/// Values matching [`MESH_TWO_FACETS`].
pub const VAL_TWO_FACETS: &str = "\
2 2\t 1.00 3.00
f1 2
\t1.000000
\t2.000000
f2 1
\t3.000000
";

/// Facet header declares three triangles but only two follow.
pub const MESH_SHORT_FACET: &str = "\
f1 3
c1
3
0 0 0
1 0 0
0 1 0
c2
3
1 0 0
1 1 0
0 1 0
";
