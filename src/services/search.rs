//! Fuzzy username ranking.
//!
//! Similarity is the length of the longest common subsequence between the
//! lowercased keyword and each lowercased candidate name. A subsequence match
//! rewards partial character-order overlap without requiring contiguity, so
//! "ali" still finds "a_lice". Candidates sharing no characters with the
//! keyword are dropped entirely.

/// Search responses are capped at this many candidates.
pub const MAX_RESULTS: usize = 20;

/// Classic full-table LCS over `char`s: diagonal carry-forward on a match,
/// otherwise the max of the cell above and the cell to the left. O(K*N) time
/// and space per pair; the whole table is built, no early exit.
pub fn lcs_length(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut table = vec![vec![0usize; b.len() + 1]; a.len() + 1];

    for i in 1..=a.len() {
        for j in 1..=b.len() {
            table[i][j] = if a[i - 1] == b[j - 1] {
                table[i - 1][j - 1] + 1
            } else {
                table[i - 1][j].max(table[i][j - 1])
            };
        }
    }

    table[a.len()][b.len()]
}

/// Ranks candidates by descending LCS similarity to `keyword`,
/// case-insensitively, keeping at most [`MAX_RESULTS`].
///
/// Equal scores keep their input order: the tie-break is an explicit
/// secondary key on the original index rather than an assumption about the
/// sort, so the store's iteration order is never further scrambled.
///
/// The caller rejects empty keywords before ranking; an empty candidate name
/// trivially scores zero and falls out.
pub fn rank_candidates<T, F>(keyword: &str, candidates: Vec<T>, name_of: F) -> Vec<T>
where
    F: Fn(&T) -> &str,
{
    let keyword = keyword.to_lowercase();

    let mut scored: Vec<(usize, usize, T)> = candidates
        .into_iter()
        .enumerate()
        .filter_map(|(index, candidate)| {
            let score = lcs_length(&keyword, &name_of(&candidate).to_lowercase());
            (score > 0).then_some((score, index, candidate))
        })
        .collect();

    scored.sort_by(|(score_a, index_a, _), (score_b, index_b, _)| {
        score_b.cmp(score_a).then(index_a.cmp(index_b))
    });
    scored.truncate(MAX_RESULTS);

    scored
        .into_iter()
        .map(|(_, _, candidate)| candidate)
        .collect()
}
