//! Sparse kernels for the Jacobian solves: triplet assembly, CSR storage,
//! ILU(0) preconditioning and BiCGSTAB.
//!
//! Small systems go through a dense `nalgebra` LU instead; these kernels
//! carry the large-system path and its fallback plumbing.

use nalgebra::{DMatrix, DVector};

use crate::error::{AirflowError, AirflowResult};

/// Coordinate-format staging for Jacobian assembly. Repeated entries at the
/// same position sum on conversion.
#[derive(Debug, Clone)]
pub struct Triplets {
    n: usize,
    entries: Vec<(usize, usize, f64)>,
}

impl Triplets {
    pub fn new(n: usize) -> Self {
        Self {
            n,
            // Zone nodes rarely connect to more than a handful of links.
            entries: Vec::with_capacity(n * 5),
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    pub fn push(&mut self, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n && col < self.n);
        self.entries.push((row, col, value));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Compress to CSR, summing duplicates. Columns within a row are sorted.
    pub fn to_csr(&self) -> CsrMatrix {
        let mut sorted = self.entries.clone();
        sorted.sort_by_key(|&(r, c, _)| (r, c));

        // Sorted order makes duplicate (row, col) pairs contiguous.
        let mut rows: Vec<usize> = Vec::with_capacity(sorted.len());
        let mut cols: Vec<usize> = Vec::with_capacity(sorted.len());
        let mut vals: Vec<f64> = Vec::with_capacity(sorted.len());
        for &(r, c, v) in &sorted {
            if rows.last() == Some(&r) && cols.last() == Some(&c) {
                *vals.last_mut().expect("non-empty") += v;
            } else {
                rows.push(r);
                cols.push(c);
                vals.push(v);
            }
        }

        let mut row_ptr = vec![0usize; self.n + 1];
        for &r in &rows {
            row_ptr[r + 1] += 1;
        }
        for i in 0..self.n {
            row_ptr[i + 1] += row_ptr[i];
        }

        CsrMatrix {
            n: self.n,
            row_ptr,
            cols,
            vals,
        }
    }

    /// Expand to a dense matrix (small-system direct path).
    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut m = DMatrix::zeros(self.n, self.n);
        for &(r, c, v) in &self.entries {
            m[(r, c)] += v;
        }
        m
    }
}

/// Compressed sparse row matrix.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    n: usize,
    row_ptr: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
}

impl CsrMatrix {
    pub fn n(&self) -> usize {
        self.n
    }

    pub fn nnz(&self) -> usize {
        self.vals.len()
    }

    fn row(&self, i: usize) -> (&[usize], &[f64]) {
        let (lo, hi) = (self.row_ptr[i], self.row_ptr[i + 1]);
        (&self.cols[lo..hi], &self.vals[lo..hi])
    }

    /// Value at (i, j) if the position is in the pattern.
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        let (cols, vals) = self.row(i);
        cols.binary_search(&j).ok().map(|k| vals[k])
    }

    pub fn matvec(&self, x: &DVector<f64>) -> DVector<f64> {
        let mut y = DVector::zeros(self.n);
        for i in 0..self.n {
            let (cols, vals) = self.row(i);
            let mut acc = 0.0;
            for (&c, &v) in cols.iter().zip(vals) {
                acc += v * x[c];
            }
            y[i] = acc;
        }
        y
    }
}

/// Incomplete LU factorisation with zero fill-in, on the matrix pattern.
#[derive(Debug, Clone)]
pub struct Ilu0 {
    n: usize,
    row_ptr: Vec<usize>,
    cols: Vec<usize>,
    vals: Vec<f64>,
    diag: Vec<usize>,
}

impl Ilu0 {
    pub fn factor(a: &CsrMatrix) -> AirflowResult<Self> {
        let n = a.n;
        let row_ptr = a.row_ptr.clone();
        let cols = a.cols.clone();
        let mut vals = a.vals.clone();

        // Locate diagonals first; a missing diagonal cannot be factored.
        let mut diag = vec![usize::MAX; n];
        for i in 0..n {
            for idx in row_ptr[i]..row_ptr[i + 1] {
                if cols[idx] == i {
                    diag[i] = idx;
                }
            }
            if diag[i] == usize::MAX {
                return Err(AirflowError::Singular {
                    what: "ILU(0): structurally missing diagonal",
                });
            }
        }

        for i in 0..n {
            let row_start = row_ptr[i];
            let row_end = row_ptr[i + 1];
            let mut idx = row_start;
            // Columns are sorted, so entries with col < i come first.
            while idx < row_end && cols[idx] < i {
                let k = cols[idx];
                let ukk = vals[diag[k]];
                if ukk.abs() < 1e-300 {
                    return Err(AirflowError::Singular {
                        what: "ILU(0): zero pivot",
                    });
                }
                let lik = vals[idx] / ukk;
                vals[idx] = lik;

                // Subtract lik * U[k, j] for every j > k present in row i.
                for kj in diag[k] + 1..row_ptr[k + 1] {
                    let j = cols[kj];
                    let row_i_cols = &cols[idx + 1..row_end];
                    if let Ok(off) = row_i_cols.binary_search(&j) {
                        vals[idx + 1 + off] -= lik * vals[kj];
                    }
                }
                idx += 1;
            }
        }

        Ok(Self {
            n,
            row_ptr,
            cols,
            vals,
            diag,
        })
    }

    /// Apply the preconditioner: solve `(L·U)·z = r`.
    pub fn apply(&self, r: &DVector<f64>) -> DVector<f64> {
        let mut z = r.clone();

        // Forward: L has unit diagonal, entries strictly left of it.
        for i in 0..self.n {
            let mut acc = z[i];
            for idx in self.row_ptr[i]..self.diag[i] {
                acc -= self.vals[idx] * z[self.cols[idx]];
            }
            z[i] = acc;
        }

        // Backward: U includes the diagonal.
        for i in (0..self.n).rev() {
            let mut acc = z[i];
            for idx in self.diag[i] + 1..self.row_ptr[i + 1] {
                acc -= self.vals[idx] * z[self.cols[idx]];
            }
            z[i] = acc / self.vals[self.diag[i]];
        }

        z
    }
}

/// Preconditioned BiCGSTAB. Returns the solution or a breakdown error; the
/// caller falls back to a direct factorisation on failure.
pub fn bicgstab(
    a: &CsrMatrix,
    b: &DVector<f64>,
    precond: &Ilu0,
    tol: f64,
    max_iterations: usize,
) -> AirflowResult<DVector<f64>> {
    let n = a.n();
    let b_norm = b.norm();
    if b_norm == 0.0 {
        return Ok(DVector::zeros(n));
    }

    let mut x = DVector::zeros(n);
    let mut r = b.clone();
    let r_hat = r.clone();
    let mut rho = 1.0;
    let mut alpha = 1.0;
    let mut omega = 1.0;
    let mut v = DVector::zeros(n);
    let mut p = DVector::zeros(n);

    for _ in 0..max_iterations {
        let rho_new = r_hat.dot(&r);
        if rho_new.abs() < 1e-300 {
            return Err(AirflowError::IterativeBreakdown {
                what: "BiCGSTAB rho breakdown",
            });
        }
        let beta = (rho_new / rho) * (alpha / omega);
        p = &r + beta * (&p - omega * &v);

        let p_hat = precond.apply(&p);
        v = a.matvec(&p_hat);
        let denom = r_hat.dot(&v);
        if denom.abs() < 1e-300 {
            return Err(AirflowError::IterativeBreakdown {
                what: "BiCGSTAB alpha breakdown",
            });
        }
        alpha = rho_new / denom;

        let s = &r - alpha * &v;
        if s.norm() <= tol * b_norm {
            x += alpha * &p_hat;
            return Ok(x);
        }

        let s_hat = precond.apply(&s);
        let t = a.matvec(&s_hat);
        let tt = t.dot(&t);
        if tt.abs() < 1e-300 {
            return Err(AirflowError::IterativeBreakdown {
                what: "BiCGSTAB t breakdown",
            });
        }
        omega = t.dot(&s) / tt;

        x += alpha * &p_hat + omega * &s_hat;
        r = &s - omega * &t;

        if r.norm() <= tol * b_norm {
            return Ok(x);
        }
        if omega.abs() < 1e-300 {
            return Err(AirflowError::IterativeBreakdown {
                what: "BiCGSTAB omega breakdown",
            });
        }
        rho = rho_new;
    }

    Err(AirflowError::IterativeBreakdown {
        what: "BiCGSTAB exceeded max iterations",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn laplacian_triplets(n: usize) -> Triplets {
        // 1-D Laplacian with Dirichlet ends: tridiagonal (-1, 2, -1).
        let mut t = Triplets::new(n);
        for i in 0..n {
            t.push(i, i, 2.0);
            if i > 0 {
                t.push(i, i - 1, -1.0);
            }
            if i + 1 < n {
                t.push(i, i + 1, -1.0);
            }
        }
        t
    }

    #[test]
    fn csr_sums_duplicates() {
        let mut t = Triplets::new(2);
        t.push(0, 0, 1.0);
        t.push(0, 0, 2.5);
        t.push(1, 1, 1.0);
        let csr = t.to_csr();
        assert_eq!(csr.nnz(), 2);
        assert_eq!(csr.get(0, 0), Some(3.5));
        assert_eq!(csr.get(1, 1), Some(1.0));
        assert_eq!(csr.get(0, 1), None);
    }

    #[test]
    fn dense_and_csr_matvec_agree() {
        let t = laplacian_triplets(6);
        let csr = t.to_csr();
        let dense = t.to_dense();
        let x = DVector::from_fn(6, |i, _| (i as f64) + 0.5);
        let y_sparse = csr.matvec(&x);
        let y_dense = &dense * &x;
        assert!((y_sparse - y_dense).norm() < 1e-12);
    }

    #[test]
    fn ilu0_is_exact_for_tridiagonal() {
        // A tridiagonal matrix has no fill-in, so ILU(0) is a complete LU
        // and one preconditioner application solves the system.
        let t = laplacian_triplets(8);
        let csr = t.to_csr();
        let ilu = Ilu0::factor(&csr).unwrap();
        let b = DVector::from_element(8, 1.0);
        let x = ilu.apply(&b);
        let residual = &b - csr.matvec(&x);
        assert!(residual.norm() < 1e-10);
    }

    #[test]
    fn bicgstab_solves_spd_system() {
        let t = laplacian_triplets(40);
        let csr = t.to_csr();
        let ilu = Ilu0::factor(&csr).unwrap();
        let b = DVector::from_fn(40, |i, _| ((i % 5) as f64) - 2.0);
        let x = bicgstab(&csr, &b, &ilu, 1e-10, 1000).unwrap();
        let residual = &b - csr.matvec(&x);
        assert!(residual.norm() < 1e-8 * b.norm().max(1.0));
    }

    #[test]
    fn bicgstab_zero_rhs_short_circuits() {
        let t = laplacian_triplets(4);
        let csr = t.to_csr();
        let ilu = Ilu0::factor(&csr).unwrap();
        let x = bicgstab(&csr, &DVector::zeros(4), &ilu, 1e-10, 100).unwrap();
        assert_eq!(x.norm(), 0.0);
    }
}
