/*!

This is the long-form manual for `survey_cleaning` and `surveyprep`.

## What happens to an export

1. The export is read (`csv` or `xlsx`). Survey tools put the real
   question text of grid questions in the first data row: the configured
   header promotions move those labels into the header, with an optional
   suffix, and the row is dropped. Punctuation is then removed from all
   the column names.
2. Rows are split by collector. Each batch loses the columns none of its
   respondents answered, then both batches are merged, primary batch first.
   The `IP Address` column is removed.
3. Emails are lower-cased and the institutional domains are removed, so
   that `Ann@RIT.edu` and `ann@g.rit.edu` are both `ann`.
4. Respondents sharing an email are reported. With the `warn` policy they
   are written to the duplicate entries file and the run continues. With
   the `halt` policy, the run stops if any of them is eligible.
5. A respondent is eligible when the number of unanswered cells is at most
   (or strictly below, see `thresholdComparison`) the number of columns
   times `completenessThreshold`.
6. One winner is drawn uniformly among the eligible respondents. The draw
   is seeded by the operating system on every run.
7. The answers of the merged respondents are recoded to numbers, and the
   columns are put in the order of the reference file.

## Scales

The following scales are built in:

* `likert` Agree very much (6) to Disagree very much (1)
* `likertReverse` the same labels, from 1 to 6, for negatively worded statements
* `experience` I have knowledge of this (1), I have personal experience with this (2)
* `software` I have heard or read about this (1), I have done this before (2)
* `webAccessibility` I’m familiar with this issue (1), I have taken this issue
  into account ... (2). Both historical spellings of the second statement are accepted.
* `boolean` No (0), Yes (1)

A label is only recoded when it matches exactly. Anything else, including
a misspelled label, a number or an empty cell, is left untouched. Running
the recoding twice gives the same result as running it once.

## Column selections

Recodings address columns by their final name, never by position:

```json
{ "scale": "likert", "columns": { "from": "Q1", "to": "Q20", "except": ["Q10"] } }
{ "scale": "boolean", "columns": ["Have you taken a course on accessibility"] }
```

All the names are checked against the data before anything is recoded.
Overrides run after the ranges, so a column listed in both gets the
override scale.

## Configuration

The `surveyprep` program reads a JSON file (see `demos/survey-config.json`).
Relative paths are relative to this file.

* `inputSettings`: `provider` (`csv` or `xlsx`), `filePath`,
  `excelWorksheetName` (required when the workbook has several sheets),
  `headerPromotions` (a list of `firstColumnIndex`, `lastColumnIndex`,
  `suffix`; indices are 1-based numbers or Excel letters),
  `stripPunctuation` (default `true`)
* `outputSettings`: `outputDirectory`, `eligibleFileName`,
  `duplicatesFileName`, `formattedFileName`, `columnOrderPath`
* `respondents`: `collectorColumn` (default `Collector ID`),
  `primaryCollectorId`, `secondaryCollectorId`, `idColumn`, `emailColumn`,
  `emailDomainSuffixes`, `privacyColumns` (default `["IP Address"]`)
* `rules`: `completenessThreshold` (default 0.2),
  `thresholdComparison` (`atMost` or `lessThan`), `duplicatePolicy`
  (`warn` or `halt`)
* `scales`: extra scales, as `{"name": {"label": code}}`. They shadow the
  built-in scales of the same name.
* `recodings` and `overrides`: lists of `{"scale", "columns"}`

## Outputs

* `Eligible-Participants.csv` eligible respondents and their `Total Incomplete Answers`
* `Duplicate-Entries.csv` only when some emails appear more than once
* `Formatted-Data.csv` the merged respondents, recoded and reordered

No file is written when the run fails.

*/
