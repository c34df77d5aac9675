use std::collections::HashSet;

use itertools::iproduct;
use rssoc::{
    c64,
    Axis,
    Cube,
    levi_civita,
    pauli,
    gvectors,
    gvectors_with,
    Indexing,
    spectral::{
        fftfreq,
        fftn,
        ifftn,
        convolve,
        pad_to,
        shape_of,
    },
};
use approx::assert_abs_diff_eq;
use rand::{
    Rng,
    SeedableRng,
    rngs::StdRng,
};


fn random_field(rng: &mut StdRng, shape: [usize; 3]) -> Cube<c64> {
    Cube::from_shape_fn(shape, |_| c64::new(rng.gen_range(-1.0 .. 1.0), rng.gen_range(-1.0 .. 1.0)))
}


#[test]
fn test_gvector_count_and_origin() {
    for (n1, n2, n3) in iproduct!(1 .. 5usize, 1 .. 5usize, 1 .. 5usize) {
        for indexing in [Indexing::Ij, Indexing::Xy] {
            let g = gvectors_with([n1, n2, n3], indexing);
            assert_eq!(g.nrows(), n1 * n2 * n3);
            assert_eq!(g.ncols(), 3);
            assert_eq!(g.row(0).to_vec(), vec![0, 0, 0]);

            // every frequency triple appears exactly once
            let set = g.rows().into_iter().map(|r| (r[0], r[1], r[2])).collect::<HashSet<_>>();
            assert_eq!(set.len(), n1 * n2 * n3);
        }
    }
}


#[test]
fn test_gvectors_follow_field_flattening() {
    // The flat index of a G-vector must be the flat index of its coefficient: a plane wave
    // e^{2πi G·r/N} has a single nonzero forward-FFT coefficient at its own position.
    let shape = [3, 4, 2];
    let g = gvectors(shape);
    let ntot = 24.0;

    for (p, gv) in g.rows().into_iter().enumerate() {
        let wave = Cube::from_shape_fn(shape, |(a, b, c)| {
            let phase = 2.0 * std::f64::consts::PI * (
                gv[0] as f64 * a as f64 / 3.0 +
                gv[1] as f64 * b as f64 / 4.0 +
                gv[2] as f64 * c as f64 / 2.0);
            c64::new(0.0, phase).exp()
        });
        let spectrum = fftn(&wave);
        let (imax, vmax) = spectrum.iter().enumerate()
            .max_by(|x, y| x.1.norm().total_cmp(&y.1.norm()))
            .unwrap();
        assert_eq!(imax, p);
        assert_abs_diff_eq!(vmax.norm(), ntot, epsilon = 1E-9);
    }
}


#[test]
fn test_levi_civita() {
    let terms = levi_civita().collect::<Vec<_>>();
    assert_eq!(terms.len(), 6);
    assert_eq!(terms.iter().map(|t| t.0).sum::<f64>(), 0.0);

    let perms = terms.iter()
        .map(|(_, ijk)| ijk.map(|a| a.index()))
        .collect::<HashSet<_>>();
    assert_eq!(perms.len(), 6);
    for ijk in perms.iter() {
        let mut sorted = *ijk;
        sorted.sort();
        assert_eq!(sorted, [0, 1, 2]);
    }

    for (levi, [i, j, k]) in terms {
        // sign of the permutation by counting inversions
        let v = [i.index(), j.index(), k.index()];
        let inversions = (v[0] > v[1]) as i32 + (v[0] > v[2]) as i32 + (v[1] > v[2]) as i32;
        let sign = if inversions % 2 == 0 { 1.0 } else { -1.0 };
        assert_eq!(levi, sign);
    }

    // restartable
    assert_eq!(levi_civita().collect::<Vec<_>>(), levi_civita().collect::<Vec<_>>());
}


#[test]
fn test_pauli_properties() {
    assert_eq!(pauli(false, false, Axis::Z), c64::new( 1.0, 0.0));
    assert_eq!(pauli(true,  true,  Axis::Z), c64::new(-1.0, 0.0));
    assert_eq!(pauli(false, true,  Axis::X), c64::new( 1.0, 0.0));
    assert_eq!(pauli(true,  false, Axis::X), c64::new( 1.0, 0.0));
    assert_eq!(pauli(false, true,  Axis::Y), -pauli(true, false, Axis::Y));
    assert_eq!(pauli(false, true,  Axis::Y), c64::new(0.0, -1.0));
    assert_eq!(pauli(false, true,  Axis::Y).norm(), 1.0);

    // hermitian
    for (s1, s2, ax) in iproduct!([false, true], [false, true], Axis::ALL) {
        assert_eq!(pauli(s1, s2, ax), pauli(s2, s1, ax).conj());
    }
}


#[test]
fn test_fftfreq_matches_numpy() {
    // numpy.fft.fftfreq(n, 1/n)
    assert_eq!(fftfreq(6), vec![0, 1, 2, -3, -2, -1]);
    assert_eq!(fftfreq(7), vec![0, 1, 2, 3, -3, -2, -1]);
}


#[test]
fn test_convolution_theorem() {
    let mut rng = StdRng::seed_from_u64(42);
    let shape = [3, 2, 4];
    let a = random_field(&mut rng, shape);
    let b = random_field(&mut rng, shape);
    let conv = convolve(&a, &b);

    for (p, v) in conv.indexed_iter() {
        let mut expected = c64::new(0.0, 0.0);
        for (q, av) in a.indexed_iter() {
            let r = (
                (p.0 + shape[0] - q.0) % shape[0],
                (p.1 + shape[1] - q.1) % shape[1],
                (p.2 + shape[2] - q.2) % shape[2],
            );
            expected += av * b[r];
        }
        assert_abs_diff_eq!(*v, expected, epsilon = 1E-12);
    }

    let back = fftn(&ifftn(&a));
    for (x, y) in back.iter().zip(a.iter()) {
        assert_abs_diff_eq!(*x, *y, epsilon = 1E-13);
    }
}


#[test]
fn test_padding_keeps_frequencies() {
    // Padding in reciprocal space only interpolates in real space: the padded field sampled
    // on the coarse grid points reproduces the coarse field up to the size ratio.
    let mut rng = StdRng::seed_from_u64(7);
    let coeffs = random_field(&mut rng, [3, 3, 3]);
    let padded = pad_to(&coeffs, [6, 9, 3]);
    assert_eq!(shape_of(&padded), [6, 9, 3]);

    let coarse = ifftn(&coeffs);
    let fine = ifftn(&padded);
    let ratio = (6.0 * 9.0 * 3.0) / 27.0;
    for ((a, b, c), v) in coarse.indexed_iter() {
        assert_abs_diff_eq!(fine[(2 * a, 3 * b, c)] * ratio, *v, epsilon = 1E-12);
    }
}
