use timbre_filters::EQUALIZER_BANDS;

/// Band-pass coefficients of one equalizer band.
#[derive(Debug, Clone, Copy)]
pub struct Coefficients {
    pub beta: f64,
    pub alpha: f64,
    pub gamma: f64,
}

const fn band(beta: f64, alpha: f64, gamma: f64) -> Coefficients {
    Coefficients { beta, alpha, gamma }
}

/// 48 kHz table, lowest band first. `alpha` is always `(1 - beta) / 2`.
pub const COEFFICIENTS_48000: [Coefficients; EQUALIZER_BANDS] = [
    band(9.9847546664e-01, 7.6226668143e-04, 1.9984647656e+00),
    band(9.9756184654e-01, 1.2190767289e-03, 1.9975344645e+00),
    band(9.9616261379e-01, 1.9186931041e-03, 1.9960947369e+00),
    band(9.9391578543e-01, 3.0421072865e-03, 1.9937449618e+00),
    band(9.9028307215e-01, 4.8584639242e-03, 1.9898465702e+00),
    band(9.8485897264e-01, 7.5705136795e-03, 1.9837962543e+00),
    band(9.7588512657e-01, 1.2057436715e-02, 1.9731772447e+00),
    band(9.6228521814e-01, 1.8857390928e-02, 1.9556164694e+00),
    band(9.4080933132e-01, 2.9595334338e-02, 1.9242054384e+00),
    band(9.0702059196e-01, 4.6489704022e-02, 1.8653476166e+00),
    band(8.5868004289e-01, 7.0659978553e-02, 1.7600401337e+00),
    band(7.8409610788e-01, 1.0795194606e-01, 1.5450725522e+00),
    band(6.8332861002e-01, 1.5833569499e-01, 1.1426447155e+00),
    band(5.5267518228e-01, 2.2366240886e-01, 4.0186190803e-01),
    band(4.1811888447e-01, 2.9094055777e-01, -7.0905944223e-01),
];
