//! Unicode symbol tables: Greek letters, mathematical operators, and the
//! character classes the lexer's compound-symbol accumulator uses.
//!
//! The lexer greedily accumulates adjacent non-ASCII letters, combining
//! marks, and super/subscripts into one compound, then resolves it here with
//! longest-match semantics: the whole compound is tried against the math
//! table first, single characters against the Greek table second, and
//! anything longer that matches neither becomes an identifier (`σ²`).

/// Greek letters recognised as standalone tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GreekLetter {
    Alpha,
    Beta,
    Gamma,
    Delta,
    Epsilon,
    Zeta,
    Eta,
    Theta,
    Iota,
    Kappa,
    Lambda,
    Mu,
    Nu,
    Xi,
    Omicron,
    Pi,
    Rho,
    Sigma,
    Tau,
    Upsilon,
    Phi,
    Chi,
    Psi,
    Omega,
    CapitalAlpha,
    CapitalBeta,
    CapitalGamma,
    CapitalDelta,
    CapitalEpsilon,
    CapitalZeta,
    CapitalEta,
    CapitalTheta,
    CapitalIota,
    CapitalKappa,
    CapitalLambda,
    CapitalMu,
    CapitalNu,
    CapitalXi,
    CapitalOmicron,
    CapitalPi,
    CapitalRho,
    CapitalSigma,
    CapitalTau,
    CapitalUpsilon,
    CapitalPhi,
    CapitalChi,
    CapitalPsi,
    CapitalOmega,
}

impl GreekLetter {
    /// Looks up a single Greek code point.
    ///
    /// Final sigma `ς` resolves to [`GreekLetter::Sigma`].
    pub fn from_char(c: char) -> Option<GreekLetter> {
        use GreekLetter::*;
        let letter = match c {
            'α' => Alpha,
            'β' => Beta,
            'γ' => Gamma,
            'δ' => Delta,
            'ε' => Epsilon,
            'ζ' => Zeta,
            'η' => Eta,
            'θ' => Theta,
            'ι' => Iota,
            'κ' => Kappa,
            'λ' => Lambda,
            'μ' => Mu,
            'ν' => Nu,
            'ξ' => Xi,
            'ο' => Omicron,
            'π' => Pi,
            'ρ' => Rho,
            'σ' | 'ς' => Sigma,
            'τ' => Tau,
            'υ' => Upsilon,
            'φ' => Phi,
            'χ' => Chi,
            'ψ' => Psi,
            'ω' => Omega,
            'Α' => CapitalAlpha,
            'Β' => CapitalBeta,
            'Γ' => CapitalGamma,
            'Δ' => CapitalDelta,
            'Ε' => CapitalEpsilon,
            'Ζ' => CapitalZeta,
            'Η' => CapitalEta,
            'Θ' => CapitalTheta,
            'Ι' => CapitalIota,
            'Κ' => CapitalKappa,
            'Λ' => CapitalLambda,
            'Μ' => CapitalMu,
            'Ν' => CapitalNu,
            'Ξ' => CapitalXi,
            'Ο' => CapitalOmicron,
            'Π' => CapitalPi,
            'Ρ' => CapitalRho,
            'Σ' => CapitalSigma,
            'Τ' => CapitalTau,
            'Υ' => CapitalUpsilon,
            'Φ' => CapitalPhi,
            'Χ' => CapitalChi,
            'Ψ' => CapitalPsi,
            'Ω' => CapitalOmega,
            _ => return None,
        };
        Some(letter)
    }
}

/// Mathematical operator symbols with their own token identity.
///
/// The relational symbols `≤`, `≥`, `≠` and the arrow `→` are *not* here:
/// the lexer folds them into the ordinary operator kinds so the parser sees
/// one spelling per operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MathSymbol {
    /// `∂`
    PartialDerivative,
    /// `∇`
    Nabla,
    /// `∫`
    Integral,
    /// `∑`
    Sum,
    /// `∏`
    Product,
    /// `√`
    Sqrt,
    /// `∛`
    CubeRoot,
    /// `·`: 3-D dot product
    Dot3D,
    /// `⊗`: tensor / cross product
    Tensor,
    /// `×`
    Cross,
    /// `∈`
    ElementOf,
    /// `∉`
    NotElementOf,
    /// `⊂`
    Subset,
    /// `⊃`
    Superset,
    /// `∪`
    Union,
    /// `∩`
    Intersection,
    /// `±`
    PlusMinus,
    /// `≈`
    Approx,
    /// `≡`
    Equivalent,
    /// `∞`
    Infinity,
    /// `∀`
    ForAll,
    /// `∃`
    Exists,
    /// `∅`
    EmptySet,
    /// `∴`
    Therefore,
    /// `∝`
    Proportional,
    /// `∠`
    Angle,
    /// `⊥`
    Perpendicular,
    /// `∥`
    ParallelTo,
}

impl MathSymbol {
    /// Longest-match lookup over a whole accumulated compound.
    pub fn from_compound(s: &str) -> Option<MathSymbol> {
        use MathSymbol::*;
        let sym = match s {
            "∂" => PartialDerivative,
            "∇" => Nabla,
            "∫" => Integral,
            "∑" => Sum,
            "∏" => Product,
            "√" => Sqrt,
            "∛" => CubeRoot,
            "·" => Dot3D,
            "⊗" => Tensor,
            "×" => Cross,
            "∈" => ElementOf,
            "∉" => NotElementOf,
            "⊂" => Subset,
            "⊃" => Superset,
            "∪" => Union,
            "∩" => Intersection,
            "±" => PlusMinus,
            "≈" => Approx,
            "≡" => Equivalent,
            "∞" => Infinity,
            "∀" => ForAll,
            "∃" => Exists,
            "∅" => EmptySet,
            "∴" => Therefore,
            "∝" => Proportional,
            "∠" => Angle,
            "⊥" => Perpendicular,
            "∥" => ParallelTo,
            _ => return None,
        };
        Some(sym)
    }
}

/// Superscript digits and letters that continue identifiers and units.
pub fn is_superscript(c: char) -> bool {
    matches!(
        c,
        '⁰' | '¹' | '²' | '³' | '⁴' | '⁵' | '⁶' | '⁷' | '⁸' | '⁹' | 'ⁿ' | 'ⁱ' | '⁺' | '⁻'
    )
}

/// Subscript digits and letters that continue identifiers.
pub fn is_subscript(c: char) -> bool {
    matches!(
        c,
        '₀' | '₁'
            | '₂'
            | '₃'
            | '₄'
            | '₅'
            | '₆'
            | '₇'
            | '₈'
            | '₉'
            | 'ₐ'
            | 'ₑ'
            | 'ₒ'
            | 'ₓ'
            | 'ₕ'
            | 'ₖ'
            | 'ₗ'
            | 'ₘ'
            | 'ₙ'
            | 'ₚ'
            | 'ₛ'
            | 'ₜ'
    )
}

/// Unicode combining marks (the common block).
pub fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}

/// Whether a non-ASCII code point may join a compound symbol.
pub fn is_compound_part(c: char) -> bool {
    !c.is_ascii()
        && (c.is_alphabetic() || is_superscript(c) || is_subscript(c) || is_combining_mark(c))
}

/// Whether a code point may continue an identifier once one has started.
pub fn continues_identifier(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || is_compound_part(c)
}
